use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{RecordDefaults, DEFAULT_BENEFIT, DEFAULT_RATING};
use crate::store::WriteMode;

/// Configuration for the catalog database and the records written into it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file (default: `<data dir>/skinshelf/catalog.db`)
    pub db_path: Option<PathBuf>,

    /// Benefit tag given to records that carry none (default: "보습")
    pub default_benefit: String,

    /// Rating given to freshly ingested records (default: 4.5)
    pub default_rating: f64,

    /// How a crawl writes into the catalog (default: full-refresh)
    pub mode: WriteMode,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            default_benefit: DEFAULT_BENEFIT.to_string(),
            default_rating: DEFAULT_RATING,
            mode: WriteMode::FullRefresh,
        }
    }
}

impl CatalogConfig {
    pub fn record_defaults(&self) -> RecordDefaults {
        RecordDefaults {
            benefit: self.default_benefit.clone(),
            rating: self.default_rating,
        }
    }
}
