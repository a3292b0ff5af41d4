use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::naming::StemCharset;
use crate::scraper::BROWSER_USER_AGENT;

/// Configuration for image resolution and local caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Directory holding cached image files (default: `<data dir>/skinshelf/product_images`)
    pub dir: Option<PathBuf>,

    /// Redirect hops followed before giving up (default: 5)
    pub max_redirects: usize,

    /// Budget for one resolve call, redirects included, in milliseconds (default: 10000)
    pub timeout_ms: u64,

    /// Concurrent image fetches per run (default: 1)
    pub concurrency: usize,

    /// Pause after each image request to go easy on the image host (default: 300)
    pub request_delay_ms: u64,

    /// Maximum length of a file stem in characters (default: 50)
    pub stem_max_len: usize,

    /// Characters kept in file stems, `unicode` or `ascii` (default: unicode)
    pub stem_charset: StemCharset,

    /// User agent sent with image requests
    pub user_agent: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_redirects: 5,
            timeout_ms: 10_000,
            concurrency: 1,
            request_delay_ms: 300,
            stem_max_len: 50,
            stem_charset: StemCharset::Unicode,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl ImageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Concurrency clamped to at least one worker
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}
