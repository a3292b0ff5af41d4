//! Configuration management for skinshelf.
//!
//! Configuration is read from `~/.config/skinshelf/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::images::ImageConfig;
use crate::scraper::{ExtractorConfig, ScraperConfig};
use crate::store::CatalogConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub extractor: ExtractorConfig,
    pub images: ImageConfig,
    pub catalog: CatalogConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating a commented default there if absent.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/skinshelf/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("skinshelf").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# skinshelf configuration
#
# Every key is optional; anything left out falls back to the value shown here.

[scraper]
# Listing page a crawl ingests
target_url = "https://www.oliveyoung.co.kr/store/main/getBestList.do"

# Run the browser without a visible window
headless = true

# Navigation timeout in seconds, including the wait for network quiescence
timeout_secs = 60

# The page counts as idle once at most idle_max_inflight requests stay pending this long (milliseconds)
network_idle_ms = 500
idle_max_inflight = 0

# Extra wait after quiescence so lazy image attributes get filled in (milliseconds)
settle_ms = 3000

[extractor]
# Nodes that may hold one product card
candidate_selectors = [".itemCard", ".prd_info", "[class*=\"product\"]"]

# Field selectors, tried in order; the first non-empty match wins
name_selectors = [".name", ".prd_name", ".itemCard_name"]
brand_selectors = [".brand", ".prd_brand", ".itemCard_brand"]
price_selectors = ["[class*=\"price\"]", ".price", ".prd_price", ".salePrice"]

# Attributes of the card's first <img> that may carry the image URL
image_attributes = ["src", "data-src", "data-lazy-src"]

# Brand recorded when none of the brand selectors match
unknown_brand = "Unknown"

# Without a price element, take the largest 3-6 digit number on the card
fallback_price = true

[images]
# Where product images are cached (default: <data dir>/skinshelf/product_images)
# dir = "/var/lib/skinshelf/product_images"

# Redirect hops followed before an image counts as failed
max_redirects = 5

# Budget for one image, redirects included (milliseconds)
timeout_ms = 10000

# Images fetched at the same time
concurrency = 1

# Pause after each image request (milliseconds)
request_delay_ms = 300

# Maximum file name stem length in characters
stem_max_len = 50

# "unicode" keeps Hangul in file names, "ascii" folds it to "_" like ASCII-only caches
stem_charset = "unicode"

[catalog]
# SQLite database file (default: <data dir>/skinshelf/catalog.db)
# db_path = "/var/lib/skinshelf/catalog.db"

# Stamped onto every ingested record
default_benefit = "보습"
default_rating = 4.5

# "full-refresh" replaces the catalog, "bulk-import" only adds unseen (name, brand) pairs
mode = "full-refresh"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
