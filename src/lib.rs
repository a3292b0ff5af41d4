//! # skinshelf
//!
//! Ingests a retailer's product listing page into a local skincare catalog.
//!
//! ## Architecture
//!
//! One run is a single pass over one rendered page:
//!
//! ```text
//! PageRenderer → RecordExtractor → classify → ImageResolver → CatalogWriter
//! ```
//!
//! - [`scraper`]: headless Chrome rendering and heuristic product-card extraction
//! - [`classifier`]: keyword-based skin-type classification
//! - [`images`]: redirect-aware image download into a local cache
//! - [`store`]: SQLite catalog with full-refresh and bulk-import write modes
//! - [`pipeline`]: run orchestration, abort handling and the run summary
//!
//! ## Quick Start
//!
//! ```bash
//! # Replace the catalog with the current best-seller list
//! skinshelf crawl
//!
//! # Add unseen products only, fetching four images at a time
//! skinshelf crawl --mode bulk-import --concurrency 4
//!
//! # What the recommendation layer would see for dry skin under 30000
//! skinshelf query --skin-type dry --max-price 30000 --benefit "보습|수분"
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store, the
/// image resolver and the page renderer.
pub mod app;

/// Configuration loaded from `~/.config/skinshelf/config.toml`.
pub mod config;

/// Command-line interface using clap.
///
/// - `crawl` - Run one ingestion
/// - `list` - List catalog records
/// - `query` - Run a recommendation-style catalog query
pub mod cli;

/// Core domain models.
///
/// - [`CatalogRecord`](domain::CatalogRecord): a persisted product
/// - [`RawCandidate`](domain::RawCandidate): an accepted, not yet enriched card
/// - [`RunSummary`](domain::RunSummary): counts reported by one run
pub mod domain;

pub mod classifier;

/// Image resolution and local caching.
pub mod images;

/// Ingestion run orchestration.
pub mod pipeline;

/// Page rendering and product-card extraction.
///
/// - [`ChromeRenderer`](scraper::ChromeRenderer): chromiumoxide-backed renderer
/// - [`PageRenderer`](scraper::PageRenderer): async trait for rendering sessions
/// - [`RecordExtractor`](scraper::RecordExtractor): selector-driven extractor
pub mod scraper;

/// SQLite persistence layer.
///
/// - [`CatalogStore`](store::CatalogStore): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`CatalogWriter`](store::CatalogWriter): write-mode dispatch
pub mod store;
