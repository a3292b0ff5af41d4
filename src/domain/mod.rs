pub mod candidate;
pub mod product;
pub mod summary;

pub use candidate::{ExtractionMiss, PriceSource, RawCandidate};
pub use product::{CatalogRecord, RecordDefaults, SkinType, DEFAULT_BENEFIT, DEFAULT_RATING};
pub use summary::{RunContext, RunSummary};
