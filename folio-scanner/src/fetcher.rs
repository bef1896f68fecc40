use crate::error::{Result, ScanError};
use crate::render::{RenderTab, Renderer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves one page's rendered markup through a session's renderer.
///
/// Each fetch opens its own tab right before navigating and closes it before
/// returning, whether the page loaded, failed or timed out.
/// A loaded page and the address it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    timeout: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_TIMEOUT)
    }
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn fetch(&self, renderer: &dyn Renderer, url: &Url) -> Result<FetchedPage> {
        self.fetch_until(renderer, url, &CancellationToken::new()).await
    }

    /// Like [`fetch`](Self::fetch), but gives up with [`ScanError::Cancelled`]
    /// as soon as `cancel` fires. The tab is released either way.
    pub async fn fetch_until(
        &self,
        renderer: &dyn Renderer,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage> {
        let mut tab = renderer
            .open_tab()
            .await
            .map_err(|e| ScanError::PageFetchFailure {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled),
            loaded = tokio::time::timeout(self.timeout, Self::load(tab.as_mut(), url)) => match loaded {
                Ok(result) => result,
                Err(_) => Err(ScanError::PageFetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            },
        };

        if let Err(e) = tab.close().await {
            debug!("Failed to release tab for {}: {}", url, e);
        }

        outcome
    }

    async fn load(tab: &mut dyn RenderTab, url: &Url) -> Result<FetchedPage> {
        tab.navigate(url).await?;
        let html = tab.content().await?;
        let url = tab.final_url().unwrap_or_else(|| url.clone());
        Ok(FetchedPage { url, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderEngine, StaticEngine};

    #[tokio::test]
    async fn test_fetch_returns_markup_and_releases_tab() {
        let engine = StaticEngine::new().with_page("https://example.com/", "<h1>Gallery</h1>");
        let tracker = engine.tracker();
        let renderer = engine.launch().await.unwrap();

        let page = PageFetcher::default()
            .fetch(renderer.as_ref(), &Url::parse("https://example.com/").unwrap())
            .await
            .unwrap();

        assert_eq!(page.html, "<h1>Gallery</h1>");
        assert_eq!(page.url.as_str(), "https://example.com/");
        assert_eq!(tracker.open_tabs(), 0);
    }

    #[tokio::test]
    async fn test_fetch_reports_redirect_target() {
        let engine = StaticEngine::new()
            .with_redirect("https://example.com/", "https://www.example.com/")
            .with_page("https://www.example.com/", "<h1>Moved</h1>");
        let renderer = engine.launch().await.unwrap();

        let page = PageFetcher::default()
            .fetch(renderer.as_ref(), &Url::parse("https://example.com/").unwrap())
            .await
            .unwrap();

        assert_eq!(page.html, "<h1>Moved</h1>");
        assert_eq!(page.url.as_str(), "https://www.example.com/");
    }

    #[tokio::test]
    async fn test_failure_releases_tab() {
        let engine = StaticEngine::new().with_failing_page("https://example.com/", "boom");
        let tracker = engine.tracker();
        let renderer = engine.launch().await.unwrap();

        let err = PageFetcher::default()
            .fetch(renderer.as_ref(), &Url::parse("https://example.com/").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::PageFetchFailure { .. }));
        assert_eq!(tracker.open_tabs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_tab() {
        let engine = StaticEngine::new().with_slow_page(
            "https://example.com/",
            Duration::from_secs(60),
            "<p>late</p>",
        );
        let tracker = engine.tracker();
        let renderer = engine.launch().await.unwrap();

        let err = PageFetcher::default()
            .fetch(renderer.as_ref(), &Url::parse("https://example.com/").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::PageFetchTimeout { secs: 30, .. }));
        assert_eq!(tracker.open_tabs(), 0);
        assert_eq!(tracker.max_open_tabs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_slow_page() {
        let engine = StaticEngine::new().with_slow_page(
            "https://example.com/",
            Duration::from_secs(20),
            "<p>late</p>",
        );
        let tracker = engine.tracker();
        let renderer = engine.launch().await.unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = PageFetcher::default()
            .fetch_until(
                renderer.as_ref(),
                &Url::parse("https://example.com/").unwrap(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(tracker.open_tabs(), 0);
    }
}
