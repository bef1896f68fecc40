//! Plain HTTP renderer: returns the served markup without executing scripts.

use super::{RenderEngine, RenderTab, Renderer, is_html_content_type};
use crate::config::HttpSettings;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpEngine {
    settings: HttpSettings,
}

impl HttpEngine {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl Default for HttpEngine {
    fn default() -> Self {
        Self::new(HttpSettings::default())
    }
}

#[async_trait]
impl RenderEngine for HttpEngine {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        let client = Client::builder()
            .user_agent(self.settings.user_agent.clone())
            .timeout(self.settings.page_timeout())
            .connect_timeout(self.settings.page_timeout() / 2)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScanError::RendererUnavailable(e.to_string()))?;

        Ok(Box::new(HttpRenderer {
            client,
            max_body_bytes: self.settings.max_body_bytes,
            active: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct HttpRenderer {
    client: Client,
    max_body_bytes: usize,
    active: Arc<AtomicUsize>,
    closed: AtomicBool,
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_tab(&self) -> Result<Box<dyn RenderTab>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::RendererUnavailable(
                "renderer already closed".to_string(),
            ));
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HttpTab {
            client: self.client.clone(),
            max_body_bytes: self.max_body_bytes,
            active: Arc::clone(&self.active),
            url: None,
            body: None,
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn active_tabs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct HttpTab {
    client: Client,
    max_body_bytes: usize,
    active: Arc<AtomicUsize>,
    url: Option<Url>,
    body: Option<String>,
}

impl HttpTab {
    fn failure(url: &Url, reason: impl Into<String>) -> ScanError {
        ScanError::PageFetchFailure {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RenderTab for HttpTab {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        debug!("GET {}", url);
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::failure(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failure(url, format!("status {}", status.as_u16())));
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            && !is_html_content_type(content_type)
        {
            return Err(Self::failure(
                url,
                format!("unsupported content type {}", content_type),
            ));
        }

        if let Some(length) = response.content_length()
            && length > self.max_body_bytes as u64
        {
            return Err(Self::failure(url, format!("body of {} bytes too large", length)));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::failure(url, e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(Self::failure(url, "body exceeds size limit"));
            }
            body.extend_from_slice(&chunk);
        }

        self.url = Some(response.url().clone());
        self.body = Some(String::from_utf8_lossy(&body).into_owned());
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.body.take().ok_or_else(|| ScanError::PageFetchFailure {
            url: self.url.as_ref().map(Url::to_string).unwrap_or_default(),
            reason: "no document loaded".to_string(),
        })
    }

    fn final_url(&self) -> Option<Url> {
        self.url.clone()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
