//! Image resolution: fetch a product image once and keep it on local disk.
//!
//! ```text
//! Reject → CacheHit → Fetch ⟲ Redirect (bounded) → Success | Failure
//! ```
//!
//! Every failure collapses to `None`; callers treat a missing image as an
//! ordinary outcome.

mod config;
mod http;
pub mod naming;

pub use config::ImageConfig;
pub use http::HttpImageClient;
pub use naming::StemCharset;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::app::Result;
use naming::{infer_extension, sanitize_stem};

/// Response body delivered in chunks as they arrive.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// A single HTTP response, redirects not followed.
pub struct ImageResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: ByteStream,
}

/// HTTP GET without automatic redirect following.
#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<ImageResponse>;
}

#[derive(Debug, thiserror::Error)]
enum FetchFailure {
    #[error("request failed: {0}")]
    Network(String),

    #[error("redirect budget of {0} exhausted")]
    TooManyRedirects(usize),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

type StemLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

pub struct ImageResolver {
    client: Arc<dyn ImageClient>,
    dir: PathBuf,
    config: ImageConfig,
    stem_locks: StemLocks,
}

/// Shared handle on one stem's lock. Dropping the last lease removes the
/// stem from the resolver's lock map.
struct StemLease<'a> {
    locks: &'a StemLocks,
    stem: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl StemLease<'_> {
    async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for StemLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Held only by the map and this lease
        let last = Arc::strong_count(&self.lock) == 2
            && locks.get(&self.stem).is_some_and(|l| Arc::ptr_eq(l, &self.lock));
        if last {
            locks.remove(&self.stem);
        }
    }
}

impl ImageResolver {
    pub fn new(client: Arc<dyn ImageClient>, dir: impl Into<PathBuf>, config: ImageConfig) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            client,
            dir,
            config,
            stem_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// File stem for a product, as used by [`resolve`](Self::resolve).
    pub fn stem_for(&self, brand: &str, name: &str) -> String {
        sanitize_stem(brand, name, self.config.stem_max_len, self.config.stem_charset)
    }

    /// Resolve with the configured redirect budget and timeout.
    pub async fn resolve(&self, source_url: &str, stem: &str) -> Option<PathBuf> {
        self.resolve_with(source_url, stem, self.config.max_redirects, self.config.timeout())
            .await
    }

    pub async fn resolve_with(
        &self,
        source_url: &str,
        stem: &str,
        max_redirects: usize,
        timeout: Duration,
    ) -> Option<PathBuf> {
        if source_url.trim().is_empty() || source_url.contains("placeholder") {
            debug!(url = source_url, "Rejected image url");
            return None;
        }

        // Cache check and write for one stem must not interleave
        let lease = self.lease_stem(stem);
        let _guard = lease.acquire().await;

        let target = self
            .dir
            .join(format!("{}.{}", stem, infer_extension(source_url)));

        if let Some(existing) = self.find_cached(stem, &target).await {
            debug!(path = %existing.display(), "Image already cached");
            return Some(existing);
        }

        let partial = partial_path(&target);
        let outcome = tokio::time::timeout(timeout, self.fetch_into(source_url, &partial, max_redirects)).await;

        let failure = match outcome {
            Ok(Ok(())) => match tokio::fs::rename(&partial, &target).await {
                Ok(()) => {
                    debug!(path = %target.display(), "Image saved");
                    return Some(target);
                }
                Err(e) => FetchFailure::Write(e),
            },
            Ok(Err(failure)) => failure,
            Err(_) => FetchFailure::Network(format!("timed out after {}ms", timeout.as_millis())),
        };

        warn!(url = source_url, error = %failure, "Image not resolved");
        let _ = tokio::fs::remove_file(&partial).await;
        None
    }

    fn lease_stem(&self, stem: &str) -> StemLease<'_> {
        let mut locks = self.stem_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks.entry(stem.to_string()).or_default().clone();
        StemLease {
            locks: &self.stem_locks,
            stem: stem.to_string(),
            lock,
        }
    }

    #[cfg(test)]
    fn locked_stems(&self) -> usize {
        self.stem_locks.lock().map_or(0, |locks| locks.len())
    }

    /// An existing file for `stem`, whatever extension it was saved with.
    async fn find_cached(&self, stem: &str, target: &Path) -> Option<PathBuf> {
        if tokio::fs::try_exists(target).await.unwrap_or(false) {
            return Some(target.to_path_buf());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let same_stem = path.file_stem().is_some_and(|s| s == stem);
            let is_partial = path.extension().is_some_and(|e| e == "part");
            if same_stem && !is_partial {
                return Some(path);
            }
        }
        None
    }

    async fn fetch_into(&self, source_url: &str, partial: &Path, max_redirects: usize) -> std::result::Result<(), FetchFailure> {
        let mut current = source_url.to_string();
        let mut redirects = 0;

        loop {
            let response = self
                .client
                .get(&current)
                .await
                .map_err(|e| FetchFailure::Network(e.to_string()))?;

            match (response.status, response.location) {
                (200, _) => return write_body(response.body, partial).await,
                (300..=399, Some(location)) => {
                    if redirects >= max_redirects {
                        return Err(FetchFailure::TooManyRedirects(max_redirects));
                    }
                    redirects += 1;
                    let next = resolve_location(&current, &location);
                    debug!(from = %current, to = %next, hop = redirects, "Following redirect");
                    current = next;
                }
                (status, _) => return Err(FetchFailure::Status(status)),
            }
        }
    }
}

async fn write_body(mut body: ByteStream, partial: &Path) -> std::result::Result<(), FetchFailure> {
    let mut file = tokio::fs::File::create(partial).await?;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| FetchFailure::Network(e.to_string()))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn resolve_location(current: &str, location: &str) -> String {
    Url::parse(current)
        .and_then(|base| base.join(location))
        .map(String::from)
        .unwrap_or_else(|_| location.to_string())
}
