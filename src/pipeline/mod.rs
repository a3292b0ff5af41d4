//! Ingestion run orchestration.
//!
//! ```text
//! ping store → render page → extract → [abort?] → begin write mode
//!            → per candidate: classify → resolve image → write → [abort?]
//! ```
//!
//! Only a failed render or an unreachable store ends a run with an error.
//! Everything else is counted in the [`RunSummary`].

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::app::{Result, SkinshelfError};
use crate::classifier::classify;
use crate::domain::{CatalogRecord, RawCandidate, RecordDefaults, RunContext, RunSummary};
use crate::images::ImageResolver;
use crate::scraper::{PageRenderer, RecordExtractor, RenderedDocument};
use crate::store::{CatalogStore, CatalogWriter, WriteMode, WriteOutcome};

/// Shared flag asking a running pipeline to stop between records.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    extractor: RecordExtractor,
    images: Arc<ImageResolver>,
    writer: CatalogWriter<dyn CatalogStore>,
    defaults: RecordDefaults,
    concurrency: usize,
    abort: AbortSignal,
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        extractor: RecordExtractor,
        images: Arc<ImageResolver>,
        store: Arc<dyn CatalogStore>,
        mode: WriteMode,
    ) -> Self {
        let concurrency = images.config().workers();
        Self {
            renderer,
            extractor,
            images,
            writer: CatalogWriter::new(store, mode),
            defaults: RecordDefaults::default(),
            concurrency,
            abort: AbortSignal::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: RecordDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Run one ingestion of `url`.
    pub async fn run(&self, url: &str) -> Result<RunSummary> {
        let mut ctx = RunContext::new();

        self.writer
            .store()
            .ping()
            .map_err(|e| SkinshelfError::StoreUnavailable(e.to_string()))?;

        info!(url, mode = %self.writer.mode(), "Starting ingestion run");

        let document = self.renderer.render(url).await.inspect_err(|e| {
            error!(url, error = %e, "Page could not be rendered");
        })?;

        let candidates = self.extract_candidates(&document, &mut ctx)?;
        info!(
            scanned = ctx.scanned(),
            accepted = ctx.accepted(),
            "Extracted candidates"
        );

        if self.abort.is_aborted() {
            warn!("Run aborted before writing");
            ctx.mark_aborted();
            return Ok(ctx.into_summary());
        }

        if self
            .writer
            .begin()
            .map_err(|e| SkinshelfError::StoreUnavailable(e.to_string()))?
            .is_some()
        {
            ctx.mark_catalog_cleared();
        }

        self.process(candidates, &mut ctx).await;

        let summary = ctx.into_summary();
        if summary.incomplete {
            warn!(
                persisted = summary.persisted,
                accepted = summary.accepted,
                catalog_cleared = summary.catalog_cleared,
                "Ingestion run incomplete"
            );
        } else {
            info!(
                persisted = summary.persisted,
                skipped = summary.skipped,
                failed = summary.write_failures,
                "Ingestion run complete"
            );
        }
        Ok(summary)
    }

    /// Parse the rendered page and split candidates into accepted ones and
    /// counted misses. Kept synchronous: the parsed tree never crosses an await.
    fn extract_candidates(&self, document: &RenderedDocument, ctx: &mut RunContext) -> Result<Vec<RawCandidate>> {
        let base = document.base_url().map_err(|e| {
            SkinshelfError::Navigation(format!("Rendered page has no usable URL {}: {}", document.url, e))
        })?;
        let html = document.parse();

        let mut accepted = Vec::new();
        for outcome in self.extractor.extract(&html, &base) {
            match outcome {
                Ok(candidate) => {
                    ctx.record_accepted(candidate.price_source);
                    accepted.push(candidate);
                }
                Err(miss) => {
                    debug!(%miss, "Candidate rejected");
                    ctx.record_miss(miss);
                }
            }
        }
        Ok(accepted)
    }

    async fn process(&self, candidates: Vec<RawCandidate>, ctx: &mut RunContext) {
        let resolver = self.images.clone();
        let delay = resolver.config().request_delay();

        let mut resolved = pin!(stream::iter(candidates)
            .map(|candidate| {
                let resolver = resolver.clone();
                async move {
                    let skin_type = classify(&candidate.name);
                    let stem = resolver.stem_for(&candidate.brand, &candidate.name);
                    let image = resolver.resolve(&candidate.image_url, &stem).await;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    (candidate, skin_type, image)
                }
            })
            .buffered(self.concurrency));

        while let Some((candidate, skin_type, image)) = resolved.next().await {
            ctx.record_image(image.is_some());

            let mut record = CatalogRecord::from_candidate(&candidate, skin_type, image.as_deref());
            self.defaults.apply(&mut record);

            match self.writer.write(&record) {
                Ok(WriteOutcome::Inserted(id)) => {
                    debug!(id, name = %record.name, skin_type = %record.skin_type, "Record written");
                    ctx.record_persisted();
                }
                Ok(WriteOutcome::Skipped) => {
                    debug!(name = %record.name, brand = %record.brand, "Record already in catalog");
                    ctx.record_skipped();
                }
                Err(e) => {
                    warn!(name = %record.name, error = %e, "Failed to write record");
                    ctx.record_write_failure();
                }
            }

            if self.abort.is_aborted() {
                warn!("Run aborted between records");
                ctx.mark_aborted();
                break;
            }
        }
    }
}
