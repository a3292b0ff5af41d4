use crate::domain::SkinType;

/// Keyword groups in match priority order. The first group with a hit wins,
/// so a name mentioning both oily and dry keywords is classified as oily.
const KEYWORD_GROUPS: [(SkinType, &[&str]); 4] = [
    (SkinType::Oily, &["지성", "오일", "모공"]),
    (SkinType::Dry, &["건성", "보습", "수분"]),
    (SkinType::Combination, &["복합", "혼합"]),
    (SkinType::Sensitive, &["민감", "약산성", "진정"]),
];

/// Catch-all category for names without any keyword hit.
pub const DEFAULT_SKIN_TYPE: SkinType = SkinType::Combination;

/// Map a product name to a skin-type category by case-insensitive substring match.
pub fn classify(name: &str) -> SkinType {
    let name = name.to_lowercase();

    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(skin_type, _)| *skin_type)
        .unwrap_or(DEFAULT_SKIN_TYPE)
}
