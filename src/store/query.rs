use serde::{Deserialize, Serialize};

use crate::domain::SkinType;

pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Text columns a [`TextMatch`] may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    Benefit,
    Name,
}

impl TextField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            TextField::Benefit => "benefit",
            TextField::Name => "name",
        }
    }
}

/// Case-insensitive substring match against any of the `|`-separated
/// alternatives in `pattern`, e.g. `"보습|수분"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub field: TextField,
    pub pattern: String,
}

impl TextMatch {
    pub fn new(field: TextField, pattern: impl Into<String>) -> Self {
        Self {
            field,
            pattern: pattern.into(),
        }
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &str> {
        self.pattern
            .split('|')
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFilter {
    MaxPrice(i64),
    /// Matches when any of the contained text matches does
    TextMatch(Vec<TextMatch>),
}

/// Skin-type equality plus zero or more OR-combined sub-filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub skin_type: SkinType,
    pub filters: Vec<QueryFilter>,
    pub limit: usize,
}

impl CatalogQuery {
    pub fn new(skin_type: SkinType) -> Self {
        Self {
            skin_type,
            filters: Vec::new(),
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}
