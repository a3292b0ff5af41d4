use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::{Result, SkinshelfError};
use crate::scraper::config::ScraperConfig;
use crate::scraper::{PageRenderer, RenderedDocument};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a closed browser gets to exit before it is killed.
const BROWSER_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Requests the page has started but not yet finished, keyed by CDP request id.
///
/// The page is idle once at most `max_inflight` requests stay pending for the
/// whole idle window. A new request restarts the window, and so does any
/// change while the count is above the threshold.
#[derive(Debug)]
struct InflightTracker {
    pending: HashSet<String>,
    max_inflight: usize,
    quiet_since: Option<Instant>,
}

impl InflightTracker {
    fn new(max_inflight: usize, now: Instant) -> Self {
        Self {
            pending: HashSet::new(),
            max_inflight,
            quiet_since: Some(now),
        }
    }

    fn started(&mut self, request_id: &str, now: Instant) {
        // Redirects reuse the request id of the hop they replace
        self.pending.insert(request_id.to_string());
        self.touch(now);
    }

    fn finished(&mut self, request_id: &str, now: Instant) {
        if self.pending.remove(request_id) {
            self.touch(now);
        }
    }

    fn touch(&mut self, now: Instant) {
        self.quiet_since = (self.pending.len() <= self.max_inflight).then_some(now);
    }

    fn inflight(&self) -> usize {
        self.pending.len()
    }

    fn is_idle(&self, now: Instant, window: Duration) -> bool {
        self.quiet_since
            .map_or(false, |since| now.saturating_duration_since(since) >= window)
    }
}

/// CDP network event subscriptions for one page.
struct NetworkActivity {
    sent: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkActivity {
    async fn subscribe(page: &Page) -> Result<Self> {
        let listen_err = |e: CdpError| SkinshelfError::Navigation(format!("Failed to listen for network events: {}", e));
        Ok(Self {
            sent: page.event_listener::<EventRequestWillBeSent>().await.map_err(listen_err)?,
            finished: page.event_listener::<EventLoadingFinished>().await.map_err(listen_err)?,
            failed: page.event_listener::<EventLoadingFailed>().await.map_err(listen_err)?,
        })
    }
}

/// Whether the browser process exited within `limit`.
async fn exited_within<F>(exit: F, limit: Duration) -> bool
where
    F: Future<Output = io::Result<Option<ExitStatus>>>,
{
    match tokio::time::timeout(limit, exit).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Browser process did not exit cleanly");
            false
        }
        Err(_) => {
            warn!(limit_secs = limit.as_secs(), "Browser process still running after close");
            false
        }
    }
}

/// Chrome-based page renderer using chromiumoxide.
///
/// Every call launches its own browser and closes it before returning, so no
/// session is ever shared between callers.
pub struct ChromeRenderer {
    config: ScraperConfig,
}

impl ChromeRenderer {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.config.timeout());

        if !self.config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| SkinshelfError::Navigation(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            SkinshelfError::Navigation(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok((browser, events))
    }

    async fn render_page(&self, browser: &Browser, url: &str) -> Result<RenderedDocument> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SkinshelfError::Navigation(format!("Failed to create page: {}", e)))?;

        let captured = self.capture(&page, url).await;

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "Page close error");
        }

        captured
    }

    async fn capture(&self, page: &Page, url: &str) -> Result<RenderedDocument> {
        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua.as_str())
                .await
                .map_err(|e| SkinshelfError::Navigation(format!("Failed to set user agent: {}", e)))?;
        }

        // Subscribe before navigating so the first requests are counted
        let mut activity = NetworkActivity::subscribe(page).await?;

        let loaded = async {
            page.goto(url)
                .await
                .map_err(|e| SkinshelfError::Navigation(format!("{}: {}", url, e)))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| SkinshelfError::Navigation(format!("{}: {}", url, e)))?;
            self.wait_for_network_idle(&mut activity).await
        };

        tokio::time::timeout(self.config.timeout(), loaded)
            .await
            .map_err(|_| {
                SkinshelfError::Timeout(format!(
                    "{} did not settle within {}s",
                    url, self.config.timeout_secs
                ))
            })??;

        // Product cards bind image attributes after the network goes quiet
        tokio::time::sleep(self.config.settle()).await;

        let html = page
            .content()
            .await
            .map_err(|e| SkinshelfError::Navigation(format!("Failed to read page content: {}", e)))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        info!(url = %final_url, bytes = html.len(), "Rendered page");
        Ok(RenderedDocument::new(final_url, html))
    }

    /// Follow request events until the in-flight count stays at or below
    /// `idle_max_inflight` for the idle window.
    async fn wait_for_network_idle(&self, activity: &mut NetworkActivity) -> Result<()> {
        let window = self.config.network_idle();
        let mut tracker = InflightTracker::new(self.config.idle_max_inflight, Instant::now());
        let mut tick = tokio::time::interval(IDLE_POLL_INTERVAL);

        loop {
            tokio::select! {
                Some(event) = activity.sent.next() => {
                    tracker.started(event.request_id.inner(), Instant::now());
                }
                Some(event) = activity.finished.next() => {
                    tracker.finished(event.request_id.inner(), Instant::now());
                }
                Some(event) = activity.failed.next() => {
                    tracker.finished(event.request_id.inner(), Instant::now());
                }
                _ = tick.tick() => {
                    if tracker.is_idle(Instant::now(), window) {
                        debug!(inflight = tracker.inflight(), "Network idle");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<RenderedDocument> {
        let (mut browser, events) = self.launch().await?;

        let rendered = self.render_page(&browser, url).await;

        // Tear the browser down on success and failure alike
        let closed = match browser.close().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Browser close error");
                false
            }
        };
        if !closed || !exited_within(browser.wait(), BROWSER_EXIT_TIMEOUT).await {
            if let Some(Err(e)) = browser.kill().await {
                warn!(error = %e, "Failed to kill browser process");
            }
        }
        events.abort();

        rendered
    }
}
