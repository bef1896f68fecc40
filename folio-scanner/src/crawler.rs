use crate::config::{CrawlBudget, HttpSettings};
use crate::error::{Result, ScanError};
use crate::extractor::Extractor;
use crate::fetcher::PageFetcher;
use crate::frontier::Frontier;
use crate::render::{RenderEngine, Renderer};
use crate::result::{CrawlReport, CrawlStats, ImageCandidate, SessionState, Termination};
use crate::robots::{ComplianceGate, CompliancePolicy};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Breadth-first, one-page-at-a-time crawler.
///
/// The crawler only holds configuration. Every call to [`crawl`](Self::crawl)
/// runs a fresh session with its own frontier, renderer and accumulator.
pub struct Crawler {
    engine: Arc<dyn RenderEngine>,
    budget: CrawlBudget,
    http: HttpSettings,
    fetcher: PageFetcher,
    progress_callback: Option<ProgressCallback>,
    cancel: CancellationToken,
    known_policy: Option<CompliancePolicy>,
}

impl Crawler {
    pub fn new(engine: Arc<dyn RenderEngine>) -> Self {
        let http = HttpSettings::default();
        Self {
            engine,
            budget: CrawlBudget::default(),
            fetcher: PageFetcher::new(http.page_timeout()),
            http,
            progress_callback: None,
            cancel: CancellationToken::new(),
            known_policy: None,
        }
    }

    pub fn with_budget(mut self, budget: CrawlBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_http_settings(mut self, http: HttpSettings) -> Self {
        self.fetcher = PageFetcher::new(http.page_timeout());
        self.http = http;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Uses an already-fetched robots policy instead of requesting
    /// `/robots.txt` again. A denying policy still aborts the crawl.
    pub fn with_compliance_policy(mut self, policy: CompliancePolicy) -> Self {
        self.known_policy = Some(policy);
        self
    }

    pub fn budget(&self) -> &CrawlBudget {
        &self.budget
    }

    pub async fn crawl(&self, start_url: &str) -> Result<CrawlReport> {
        let mut session = Session::new();
        match self.run(&mut session, start_url).await {
            Ok(report) => {
                session.transition(SessionState::Completed);
                info!(
                    "Crawl of {} complete: {} pages, {} images ({:?})",
                    report.start_url,
                    report.stats.pages_visited,
                    report.images.len(),
                    report.termination
                );
                Ok(report)
            }
            Err(e) => {
                session.transition(SessionState::Aborted);
                warn!("Crawl of {} aborted: {}", start_url, e);
                Err(e)
            }
        }
    }

    async fn run(&self, session: &mut Session, start_url: &str) -> Result<CrawlReport> {
        self.budget.validate()?;
        let start = parse_start_url(start_url)?;

        info!("Starting crawl of {}", start);
        let renderer = self.engine.launch().await.map_err(|e| match e {
            ScanError::RendererUnavailable(_) => e,
            other => ScanError::RendererUnavailable(other.to_string()),
        })?;

        let outcome = self.crawl_with(session, renderer.as_ref(), start).await;

        if let Err(e) = renderer.close().await {
            warn!("Failed to close renderer: {}", e);
        }
        outcome
    }

    async fn crawl_with(
        &self,
        session: &mut Session,
        renderer: &dyn Renderer,
        start: Url,
    ) -> Result<CrawlReport> {
        let policy = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
            policy = self.authorize(&start) => policy?,
        };
        let delay = self.effective_delay(&policy);
        debug!("Politeness delay: {:?}", delay);

        session.transition(SessionState::Running);

        let extractor = Extractor::new(self.budget.max_links_per_level);
        let mut frontier = Frontier::new(start.clone(), self.budget.max_depth);

        let termination = loop {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            if session.images.len() >= self.budget.max_images_per_site {
                break Termination::ImageBudgetReached;
            }
            if frontier.visited_count() >= self.budget.max_pages_visited {
                break Termination::PageBudgetReached;
            }
            let Some(task) = frontier.pop() else {
                break Termination::FrontierExhausted;
            };
            if !frontier.mark_visited(&task.url) {
                continue;
            }
            session.stats.pages_visited += 1;

            if let Some(ref callback) = self.progress_callback {
                callback(session.stats.pages_visited, task.url.to_string());
            }

            if task.depth > 0 && !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ScanError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            debug!("Fetching {} (depth {})", task.url, task.depth);
            let fetched = match self
                .fetcher
                .fetch_until(renderer, &task.url, &self.cancel)
                .await
            {
                Ok(fetched) => fetched,
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => {
                    warn!("Skipping {}: {}", task.url, e);
                    session.stats.pages_failed += 1;
                    continue;
                }
            };

            let base = if fetched.url != task.url && same_site(&fetched.url, &task.url) {
                debug!("{} redirected to {}", task.url, fetched.url);
                frontier.mark_alias(&fetched.url);
                &fetched.url
            } else {
                &task.url
            };
            let page = extractor.extract(&fetched.html, base);
            session.stats.links_over_cap += page.links_over_cap;
            session.stats.items_unresolved += page.unresolved;
            session.collect(page.images, self.budget.max_images_per_site);

            let enqueued = frontier.enqueue_children(&task, page.links);
            session.stats.links_enqueued += enqueued;
            debug!(
                "{}: {} links enqueued, {} images so far",
                task.url,
                enqueued,
                session.images.len()
            );
        };

        session.stats.images_collected = session.images.len();
        Ok(CrawlReport {
            start_url: start.to_string(),
            visited: frontier.into_visited(),
            images: std::mem::take(&mut session.images),
            stats: std::mem::take(&mut session.stats),
            termination,
        })
    }

    async fn authorize(&self, start: &Url) -> Result<CompliancePolicy> {
        if let Some(ref policy) = self.known_policy {
            if policy.denied {
                return Err(ScanError::ComplianceDenied(format!(
                    "{}/robots.txt",
                    start.origin().ascii_serialization()
                )));
            }
            return Ok(policy.clone());
        }
        match ComplianceGate::new(&self.http) {
            Ok(gate) => gate.authorize(start).await,
            Err(e) => {
                warn!("Compliance check unavailable ({}), permitting crawl", e);
                Ok(CompliancePolicy::permissive())
            }
        }
    }

    fn effective_delay(&self, policy: &CompliancePolicy) -> Duration {
        let delay = self.budget.politeness_delay();
        match policy.crawl_delay {
            Some(crawl_delay) if self.http.honor_crawl_delay => {
                delay.max(crawl_delay.min(self.http.max_crawl_delay()))
            }
            _ => delay,
        }
    }
}

/// Same scheme and port, and hosts equal once a leading `www.` is ignored.
fn same_site(a: &Url, b: &Url) -> bool {
    fn bare(url: &Url) -> Option<&str> {
        url.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h))
    }
    a.scheme() == b.scheme()
        && a.port_or_known_default() == b.port_or_known_default()
        && bare(a).is_some_and(|host| bare(b) == Some(host))
}

/// Accepts absolute http(s) URLs with a host.
pub fn parse_start_url(start_url: &str) -> Result<Url> {
    let url = Url::parse(start_url.trim())
        .map_err(|e| ScanError::InvalidStartUrl(format!("{}: {}", start_url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidStartUrl(format!(
            "{}: unsupported scheme '{}'",
            start_url,
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScanError::InvalidStartUrl(format!("{}: missing host", start_url)));
    }
    Ok(url)
}

/// Mutable state of one crawl.
struct Session {
    state: SessionState,
    images: Vec<ImageCandidate>,
    seen_images: HashSet<String>,
    stats: CrawlStats,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            images: Vec::new(),
            seen_images: HashSet::new(),
            stats: CrawlStats::default(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Appends images not seen earlier in the session, stopping at `limit`.
    fn collect(&mut self, images: Vec<ImageCandidate>, limit: usize) {
        for image in images {
            if self.images.len() >= limit {
                break;
            }
            if self.seen_images.insert(image.source_url.clone()) {
                self.images.push(image);
            } else {
                self.stats.duplicate_images += 1;
            }
        }
    }
}
