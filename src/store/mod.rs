pub mod config;
pub mod query;
pub mod sqlite;
pub mod writer;

use crate::app::Result;
use crate::domain::CatalogRecord;

pub use config::CatalogConfig;
pub use query::{CatalogQuery, QueryFilter, TextField, TextMatch};
pub use sqlite::SqliteStore;
pub use writer::{CatalogWriter, WriteMode, WriteOutcome, WriteReport};

/// Persistent product catalog.
///
/// Carries both ingestion write modes (`replace_all` and
/// `upsert_if_absent`) and the read side the recommendation layer uses.
pub trait CatalogStore: Send + Sync {
    /// Cheap round trip proving the store is reachable.
    fn ping(&self) -> Result<()>;

    // Write primitives
    fn clear_all(&self) -> Result<usize>;
    fn insert(&self, record: &CatalogRecord) -> Result<String>;

    /// Wipe the catalog, then insert every record. A failing record is
    /// counted and skipped; the wipe is never rolled back.
    fn replace_all(&self, records: &[CatalogRecord]) -> Result<WriteReport>;

    /// Insert unless a record with the same (name, brand) exists.
    fn upsert_if_absent(&self, record: &CatalogRecord) -> Result<WriteOutcome>;

    // Reads
    fn find_by_name_brand(&self, name: &str, brand: &str) -> Result<Option<CatalogRecord>>;
    fn find_by_skin_type(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>>;
    fn all_records(&self) -> Result<Vec<CatalogRecord>>;
    fn count(&self) -> Result<usize>;
}
