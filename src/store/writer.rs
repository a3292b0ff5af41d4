use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::{Result, SkinshelfError};
use crate::domain::CatalogRecord;
use crate::store::CatalogStore;

/// How a run's records land in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Wipe the catalog, then insert everything the run produced
    #[default]
    FullRefresh,
    /// Keep existing records; insert only unseen (name, brand) pairs
    BulkImport,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::FullRefresh => "full-refresh",
            WriteMode::BulkImport => "bulk-import",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = SkinshelfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full-refresh" | "full_refresh" | "refresh" => Ok(WriteMode::FullRefresh),
            "bulk-import" | "bulk_import" | "import" => Ok(WriteMode::BulkImport),
            other => Err(SkinshelfError::Config(format!(
                "unknown write mode '{}' (expected full-refresh or bulk-import)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(String),
    /// A record with the same (name, brand) was already present
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub cleared: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Applies a [`WriteMode`] on top of a [`CatalogStore`].
pub struct CatalogWriter<S: CatalogStore + ?Sized> {
    store: Arc<S>,
    mode: WriteMode,
}

impl<S: CatalogStore + ?Sized> CatalogWriter<S> {
    pub fn new(store: Arc<S>, mode: WriteMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Prepare the catalog for a stream of [`write`](Self::write) calls.
    ///
    /// In full-refresh mode this wipes the catalog and returns the number of
    /// removed records. Bulk import leaves the catalog alone.
    pub fn begin(&self) -> Result<Option<usize>> {
        match self.mode {
            WriteMode::FullRefresh => {
                let removed = self.store.clear_all()?;
                info!(removed, "Cleared catalog for full refresh");
                Ok(Some(removed))
            }
            WriteMode::BulkImport => Ok(None),
        }
    }

    pub fn write(&self, record: &CatalogRecord) -> Result<WriteOutcome> {
        match self.mode {
            WriteMode::FullRefresh => self.store.insert(record).map(WriteOutcome::Inserted),
            WriteMode::BulkImport => self.store.upsert_if_absent(record),
        }
    }

    /// Write a whole batch at once. Individual failures are counted, never
    /// propagated.
    pub fn write_all(&self, records: &[CatalogRecord]) -> Result<WriteReport> {
        match self.mode {
            WriteMode::FullRefresh => self.store.replace_all(records),
            WriteMode::BulkImport => {
                let mut report = WriteReport::default();
                for record in records {
                    match self.store.upsert_if_absent(record) {
                        Ok(WriteOutcome::Inserted(_)) => report.inserted += 1,
                        Ok(WriteOutcome::Skipped) => report.skipped += 1,
                        Err(_) => report.failed += 1,
                    }
                }
                Ok(report)
            }
        }
    }
}
