use std::fmt;

use serde::Serialize;

use crate::domain::{ExtractionMiss, PriceSource};

/// Mutable per-run counters, threaded through every pipeline stage.
#[derive(Debug, Default)]
pub struct RunContext {
    scanned: usize,
    accepted: usize,
    fallback_prices: usize,
    images_resolved: usize,
    images_failed: usize,
    persisted: usize,
    skipped: usize,
    write_failures: usize,
    catalog_cleared: bool,
    aborted: bool,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&mut self, price_source: PriceSource) {
        self.scanned += 1;
        self.accepted += 1;
        if price_source == PriceSource::Fallback {
            self.fallback_prices += 1;
        }
    }

    pub fn record_miss(&mut self, _miss: ExtractionMiss) {
        self.scanned += 1;
    }

    pub fn record_image(&mut self, resolved: bool) {
        if resolved {
            self.images_resolved += 1;
        } else {
            self.images_failed += 1;
        }
    }

    pub fn record_persisted(&mut self) {
        self.persisted += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn mark_catalog_cleared(&mut self) {
        self.catalog_cleared = true;
    }

    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Freeze the counters into the summary handed back to the caller.
    pub fn into_summary(self) -> RunSummary {
        let written = self.persisted + self.skipped + self.write_failures;
        RunSummary {
            scanned: self.scanned,
            accepted: self.accepted,
            fallback_prices: self.fallback_prices,
            images_resolved: self.images_resolved,
            images_failed: self.images_failed,
            persisted: self.persisted,
            skipped: self.skipped,
            write_failures: self.write_failures,
            catalog_cleared: self.catalog_cleared,
            aborted: self.aborted,
            incomplete: self.aborted || written < self.accepted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub scanned: usize,
    pub accepted: usize,
    pub fallback_prices: usize,
    pub images_resolved: usize,
    pub images_failed: usize,
    pub persisted: usize,
    pub skipped: usize,
    pub write_failures: usize,
    pub catalog_cleared: bool,
    pub aborted: bool,
    /// Not every accepted record reached the store. With `catalog_cleared`
    /// set, the catalog holds only a partial refresh.
    pub incomplete: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scanned:          {}", self.scanned)?;
        writeln!(
            f,
            "Accepted:         {} ({} priced by fallback)",
            self.accepted, self.fallback_prices
        )?;
        writeln!(
            f,
            "Images:           {} resolved, {} failed",
            self.images_resolved, self.images_failed
        )?;
        writeln!(
            f,
            "Catalog:          {} persisted, {} skipped, {} failed",
            self.persisted, self.skipped, self.write_failures
        )?;
        if self.incomplete {
            write!(f, "Run INCOMPLETE")?;
            if self.catalog_cleared {
                write!(f, " (catalog was cleared and holds a partial refresh)")?;
            }
        } else {
            write!(f, "Run complete")?;
        }
        Ok(())
    }
}
