use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::{Result, SkinshelfError};
use crate::domain::{PriceSource, RawCandidate};

pub const DEFAULT_BENEFIT: &str = "보습";
pub const DEFAULT_RATING: f64 = 4.5;

/// The closed set of skin-type categories a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinType {
    Oily,
    Dry,
    Combination,
    Sensitive,
}

impl SkinType {
    pub const ALL: [SkinType; 4] = [
        SkinType::Oily,
        SkinType::Dry,
        SkinType::Combination,
        SkinType::Sensitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Oily => "oily",
            SkinType::Dry => "dry",
            SkinType::Combination => "combination",
            SkinType::Sensitive => "sensitive",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinType {
    type Err = SkinshelfError;

    fn from_str(s: &str) -> Result<Self> {
        SkinType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SkinshelfError::InvalidRecord(format!("unknown skin type: {}", s)))
    }
}

/// Values stamped onto every record an ingestion run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefaults {
    pub benefit: String,
    pub rating: f64,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            benefit: DEFAULT_BENEFIT.to_string(),
            rating: DEFAULT_RATING,
        }
    }
}

impl RecordDefaults {
    pub fn apply(&self, record: &mut CatalogRecord) {
        record.benefit = self.benefit.clone();
        record.rating = self.rating;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Surrogate key; assigned by the store on first write when absent
    pub id: Option<String>,
    pub name: String,
    pub brand: String,
    pub price: i64,
    pub price_source: PriceSource,
    pub benefit: String,
    pub skin_type: SkinType,
    pub ingredients: Vec<String>,
    pub warnings: Vec<String>,
    /// File name of the locally cached image, relative to the image directory
    pub image: Option<String>,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

impl CatalogRecord {
    pub fn new(name: impl Into<String>, brand: impl Into<String>, price: i64, skin_type: SkinType) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: brand.into(),
            price,
            price_source: PriceSource::Element,
            benefit: DEFAULT_BENEFIT.to_string(),
            skin_type,
            ingredients: Vec::new(),
            warnings: Vec::new(),
            image: None,
            rating: DEFAULT_RATING,
            created_at: Utc::now(),
        }
    }

    /// Build a record from an accepted candidate and its resolved image, if any.
    pub fn from_candidate(candidate: &RawCandidate, skin_type: SkinType, image: Option<&Path>) -> Self {
        let mut record = Self::new(
            candidate.name.clone(),
            candidate.brand.clone(),
            candidate.price,
            skin_type,
        );
        record.price_source = candidate.price_source;
        record.image = image
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        record
    }

    /// Assign a fresh surrogate key if the record does not carry one yet.
    pub fn ensure_id(&mut self) -> &str {
        self.id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .as_str()
    }

    /// Check the persistence invariant: non-empty name and strictly positive price.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SkinshelfError::InvalidRecord("empty name".into()));
        }
        if self.price <= 0 {
            return Err(SkinshelfError::InvalidRecord(format!(
                "non-positive price {} for {}",
                self.price, self.name
            )));
        }
        Ok(())
    }

    pub fn image_path(&self, image_dir: &Path) -> Option<PathBuf> {
        self.image.as_ref().map(|name| image_dir.join(name))
    }

    pub fn display_brand(&self) -> &str {
        if self.brand.is_empty() {
            "Unknown"
        } else {
            &self.brand
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> RawCandidate {
        RawCandidate {
            name: "보습 에센스".into(),
            brand: "라운드랩".into(),
            price: 15000,
            price_source: PriceSource::Fallback,
            image_url: "https://host/a.jpg".into(),
        }
    }

    #[test]
    fn test_skin_type_round_trips_through_str() {
        for t in SkinType::ALL {
            assert_eq!(t.as_str().parse::<SkinType>().unwrap(), t);
        }
        assert_eq!("OILY".parse::<SkinType>().unwrap(), SkinType::Oily);
        assert!("normal".parse::<SkinType>().is_err());
    }

    #[test]
    fn test_from_candidate_applies_defaults() {
        let record = CatalogRecord::from_candidate(
            &candidate(),
            SkinType::Dry,
            Some(Path::new("/tmp/images/a_b.jpg")),
        );
        assert_eq!(record.id, None);
        assert_eq!(record.benefit, DEFAULT_BENEFIT);
        assert_eq!(record.rating, DEFAULT_RATING);
        assert!(record.ingredients.is_empty());
        assert!(record.warnings.is_empty());
        assert_eq!(record.image.as_deref(), Some("a_b.jpg"));
        assert_eq!(record.price_source, PriceSource::Fallback);
    }

    #[test]
    fn test_from_candidate_without_image() {
        let record = CatalogRecord::from_candidate(&candidate(), SkinType::Dry, None);
        assert_eq!(record.image, None);
        assert_eq!(record.image_path(Path::new("/img")), None);
    }

    #[test]
    fn test_record_defaults_override_benefit_and_rating() {
        let mut record = CatalogRecord::from_candidate(&candidate(), SkinType::Dry, None);
        let defaults = RecordDefaults {
            benefit: "진정".into(),
            rating: 4.0,
        };
        defaults.apply(&mut record);
        assert_eq!(record.benefit, "진정");
        assert_eq!(record.rating, 4.0);
    }

    #[test]
    fn test_ensure_id_is_stable_once_assigned() {
        let mut record = CatalogRecord::new("a", "b", 100, SkinType::Oily);
        let first = record.ensure_id().to_string();
        let second = record.ensure_id().to_string();
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }

    #[test]
    fn test_validate_rejects_broken_records() {
        assert!(CatalogRecord::new("a", "b", 100, SkinType::Oily).validate().is_ok());
        assert!(CatalogRecord::new("  ", "b", 100, SkinType::Oily).validate().is_err());
        assert!(CatalogRecord::new("a", "b", 0, SkinType::Oily).validate().is_err());
        assert!(CatalogRecord::new("a", "b", -5, SkinType::Oily).validate().is_err());
    }
}
