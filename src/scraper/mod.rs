//! Page fetching and product-card extraction.
//!
//! ```text
//! target URL → PageRenderer → RenderedDocument → RecordExtractor → RawCandidate*
//! ```
//!
//! The renderer drives a real browser so asynchronously loaded product cards
//! are present; the extractor then walks the rendered HTML once.

mod chrome;
mod config;
mod extractor;

pub use chrome::ChromeRenderer;
pub use config::{ExtractorConfig, ScraperConfig, BROWSER_USER_AGENT, DEFAULT_TARGET_URL};
pub use extractor::{FieldStrategy, PriceHit, RecordExtractor};

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::app::Result;

/// A fully rendered page, captured once after the network settled.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Final URL after navigation; relative image URLs are rebased onto its origin
    pub url: String,
    pub html: String,
}

impl RenderedDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }

    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }
}

/// A rendering session able to turn a URL into a rendered document.
///
/// Implementations own their session for the duration of one call and must
/// release it on every exit path.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedDocument>;
}
