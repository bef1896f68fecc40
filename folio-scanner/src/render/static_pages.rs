//! In-memory renderer serving fixed markup per URL.
//!
//! Used for offline scoring, dry runs and tests. A shared [`RenderTracker`]
//! records launches, navigations and tab lifetimes so callers can check that
//! no tab outlives its page and that every launched engine was closed.

use super::{RenderEngine, RenderTab, Renderer};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

#[derive(Debug, Clone)]
enum StaticPage {
    Html(String),
    Delayed(Duration, String),
    Failing(String),
    Redirect(String),
}

#[derive(Debug, Default)]
pub struct RenderTracker {
    launches: AtomicUsize,
    closes: AtomicUsize,
    open_tabs: AtomicUsize,
    max_open_tabs: AtomicUsize,
    navigations: Mutex<Vec<(String, Instant)>>,
}

impl RenderTracker {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn open_tabs(&self) -> usize {
        self.open_tabs.load(Ordering::SeqCst)
    }

    /// Highest number of tabs open at the same time.
    pub fn max_open_tabs(&self) -> usize {
        self.max_open_tabs.load(Ordering::SeqCst)
    }

    /// URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigated_at().into_iter().map(|(url, _)| url).collect()
    }

    /// URLs navigated to with the time each navigation started.
    pub fn navigated_at(&self) -> Vec<(String, Instant)> {
        self.navigations
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    fn tab_opened(&self) {
        let open = self.open_tabs.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open_tabs.fetch_max(open, Ordering::SeqCst);
    }

    fn tab_closed(&self) {
        self.open_tabs.fetch_sub(1, Ordering::SeqCst);
    }

    fn navigated(&self, url: &str) {
        if let Ok(mut navigations) = self.navigations.lock() {
            navigations.push((url.to_string(), Instant::now()));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticEngine {
    pages: HashMap<String, StaticPage>,
    tracker: Arc<RenderTracker>,
}

fn page_key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl StaticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages
            .insert(page_key(url), StaticPage::Html(html.into()));
        self
    }

    /// A page whose markup only becomes available after `delay`.
    pub fn with_slow_page(mut self, url: &str, delay: Duration, html: impl Into<String>) -> Self {
        self.pages
            .insert(page_key(url), StaticPage::Delayed(delay, html.into()));
        self
    }

    pub fn with_failing_page(mut self, url: &str, reason: impl Into<String>) -> Self {
        self.pages
            .insert(page_key(url), StaticPage::Failing(reason.into()));
        self
    }

    /// Navigating to `from` serves the page registered for `to`.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.pages
            .insert(page_key(from), StaticPage::Redirect(page_key(to)));
        self
    }

    pub fn tracker(&self) -> Arc<RenderTracker> {
        Arc::clone(&self.tracker)
    }
}

#[async_trait]
impl RenderEngine for StaticEngine {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        self.tracker.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticRenderer {
            pages: Arc::new(self.pages.clone()),
            tracker: Arc::clone(&self.tracker),
            active: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }))
    }
}

struct StaticRenderer {
    pages: Arc<HashMap<String, StaticPage>>,
    tracker: Arc<RenderTracker>,
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn open_tab(&self) -> Result<Box<dyn RenderTab>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::RendererUnavailable(
                "renderer already closed".to_string(),
            ));
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        self.tracker.tab_opened();
        Ok(Box::new(StaticTab {
            pages: Arc::clone(&self.pages),
            tracker: Arc::clone(&self.tracker),
            active: Arc::clone(&self.active),
            loaded: None,
            landed: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.tracker.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct StaticTab {
    pages: Arc<HashMap<String, StaticPage>>,
    tracker: Arc<RenderTracker>,
    active: Arc<AtomicUsize>,
    loaded: Option<String>,
    landed: Option<Url>,
}

#[async_trait]
impl RenderTab for StaticTab {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.tracker.navigated(url.as_str());
        let mut target = url.clone();
        let mut page = self.pages.get(target.as_str());
        // one hop, like a single 301
        if let Some(StaticPage::Redirect(to)) = page {
            target = Url::parse(to)?;
            page = self.pages.get(target.as_str());
        }
        self.landed = Some(target);
        match page {
            Some(StaticPage::Html(html)) => {
                self.loaded = Some(html.clone());
                Ok(())
            }
            Some(StaticPage::Delayed(delay, html)) => {
                tokio::time::sleep(*delay).await;
                self.loaded = Some(html.clone());
                Ok(())
            }
            Some(StaticPage::Redirect(_)) => Err(ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: "too many redirects".to_string(),
            }),
            Some(StaticPage::Failing(reason)) => Err(ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: "status 404".to_string(),
            }),
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.loaded
            .clone()
            .ok_or_else(|| ScanError::PageFetchFailure {
                url: String::new(),
                reason: "no document loaded".to_string(),
            })
    }

    fn final_url(&self) -> Option<Url> {
        self.landed.clone()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.tracker.tab_closed();
        Ok(())
    }
}
