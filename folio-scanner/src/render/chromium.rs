//! Headless Chromium renderer using chromiumoxide.
//!
//! Pages are read back through `document.documentElement.outerHTML` after
//! navigation, so markup inserted by client-side scripts is included.

use super::{RenderEngine, RenderTab, Renderer};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Environment variable pointing at a Chrome/Chromium executable.
pub const CHROMIUM_PATH_ENV: &str = "FOLIO_CHROMIUM_PATH";

#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Uses `FOLIO_CHROMIUM_PATH` when set, otherwise chromiumoxide's own discovery.
    pub fn new() -> Self {
        let executable = std::env::var(CHROMIUM_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .filter(|p| p.exists());
        Self { executable }
    }

    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if let Some(ref path) = self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScanError::RendererUnavailable(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::RendererUnavailable(format!("failed to launch Chromium: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("Chromium handler event error");
                }
            }
        });

        Ok(Box::new(ChromiumRenderer {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            active: Arc::new(AtomicUsize::new(0)),
        }))
    }
}

pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open_tab(&self) -> Result<Box<dyn RenderTab>> {
        let guard = self.browser.lock().await;
        let browser = guard.as_ref().ok_or_else(|| {
            ScanError::RendererUnavailable("browser already closed".to_string())
        })?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::RendererUnavailable(format!("failed to open tab: {e}")))?;

        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ChromiumTab {
            page: Some(page),
            active: Arc::clone(&self.active),
            url: String::new(),
            landed: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close Chromium cleanly: {}", e);
            }
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct ChromiumTab {
    page: Option<Page>,
    active: Arc<AtomicUsize>,
    url: String,
    landed: Option<Url>,
}

impl ChromiumTab {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or_else(|| ScanError::PageFetchFailure {
            url: self.url.clone(),
            reason: "tab already closed".to_string(),
        })
    }
}

#[async_trait]
impl RenderTab for ChromiumTab {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.url = url.to_string();
        let page = self.page()?;
        page.goto(url.as_str())
            .await
            .map_err(|e| ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: format!("navigation failed: {e}"),
            })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: format!("page never settled: {e}"),
            })?;
        self.landed = match page.url().await {
            Ok(Some(current)) => Url::parse(&current).ok(),
            _ => None,
        };
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        let url = self.url.clone();
        let result = self
            .page()?
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| ScanError::PageFetchFailure {
                url: url.clone(),
                reason: format!("could not read document: {e}"),
            })?;
        result
            .into_value::<String>()
            .map_err(|e| ScanError::PageFetchFailure {
                url,
                reason: format!("document was not a string: {e:?}"),
            })
    }

    fn final_url(&self) -> Option<Url> {
        self.landed.clone()
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Failed to close tab for {}: {}", self.url, e);
        }
        Ok(())
    }
}
