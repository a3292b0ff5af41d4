use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TARGET_URL: &str = "https://www.oliveyoung.co.kr/store/main/getBestList.do";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the rendering session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing page to ingest
    pub target_url: String,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Navigation timeout in seconds, covering load and network quiescence (default: 60)
    pub timeout_secs: u64,

    /// How long the in-flight request count must stay at or below
    /// `idle_max_inflight` for the page to count as idle (default: 500)
    pub network_idle_ms: u64,

    /// Pending requests tolerated while idle, for long-polling pages (default: 0)
    pub idle_max_inflight: usize,

    /// Fixed wait after quiescence for late-binding attributes in milliseconds (default: 3000)
    pub settle_ms: u64,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            headless: true,
            timeout_secs: 60,
            network_idle_ms: 500,
            idle_max_inflight: 0,
            settle_ms: 3000,
            user_agent: Some(BROWSER_USER_AGENT.to_string()),
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Selector lists driving the record extractor, each in priority order.
///
/// Site markup changes are handled by editing these lists, not the code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Nodes that may represent one product card
    pub candidate_selectors: Vec<String>,
    pub name_selectors: Vec<String>,
    pub brand_selectors: Vec<String>,
    /// Dedicated price-styled elements, tried before the whole-card fallback
    pub price_selectors: Vec<String>,
    /// Attributes of the card's first `img` holding the image URL
    pub image_attributes: Vec<String>,
    /// Brand recorded when no brand selector matches
    pub unknown_brand: String,
    /// Whether to fall back to the largest 3-6 digit number on the card
    pub fallback_price: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            candidate_selectors: vec![
                ".itemCard".to_string(),
                ".prd_info".to_string(),
                "[class*=\"product\"]".to_string(),
            ],
            name_selectors: vec![
                ".name".to_string(),
                ".prd_name".to_string(),
                ".itemCard_name".to_string(),
            ],
            brand_selectors: vec![
                ".brand".to_string(),
                ".prd_brand".to_string(),
                ".itemCard_brand".to_string(),
            ],
            price_selectors: vec![
                "[class*=\"price\"]".to_string(),
                ".price".to_string(),
                ".prd_price".to_string(),
                ".salePrice".to_string(),
            ],
            image_attributes: vec![
                "src".to_string(),
                "data-src".to_string(),
                "data-lazy-src".to_string(),
            ],
            unknown_brand: "Unknown".to_string(),
            fallback_price: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scraper_config_values() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.network_idle(), Duration::from_millis(500));
        assert_eq!(config.idle_max_inflight, 0);
        assert_eq!(config.settle(), Duration::from_millis(3000));
        assert!(config.user_agent.as_deref().unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_default_extractor_config_lists() {
        let config = ExtractorConfig::default();
        assert_eq!(config.candidate_selectors.len(), 3);
        assert_eq!(config.image_attributes, vec!["src", "data-src", "data-lazy-src"]);
        assert_eq!(config.unknown_brand, "Unknown");
        assert!(config.fallback_price);
    }

    #[test]
    fn test_idle_threshold_from_toml() {
        let config: ScraperConfig =
            toml::from_str("idle_max_inflight = 2").expect("partial config");
        assert_eq!(config.idle_max_inflight, 2);
        assert_eq!(config.network_idle_ms, 500);
    }

    #[test]
    fn test_partial_extractor_config_keeps_defaults() {
        let config: ExtractorConfig =
            toml::from_str("name_selectors = [\".title\"]").expect("partial config");
        assert_eq!(config.name_selectors, vec![".title"]);
        assert_eq!(config.brand_selectors[0], ".brand");
    }
}
