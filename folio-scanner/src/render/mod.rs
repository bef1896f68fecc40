//! Renderer abstraction for page rendering.
//!
//! A [`RenderEngine`] launches one [`Renderer`] per crawl session. The renderer
//! hands out short-lived [`RenderTab`]s, one per page, which must be closed
//! once the page's markup has been read. The crawler closes the renderer when
//! the session ends.

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod http;
pub mod static_pages;

use crate::error::Result;
use async_trait::async_trait;
use url::Url;

pub use http::HttpEngine;
pub use static_pages::{RenderTracker, StaticEngine};

/// Starts render-capable engines, one per crawl session.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Renderer>>;
}

/// A running engine shared by all pages of one session.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a fresh tab for a single page.
    async fn open_tab(&self) -> Result<Box<dyn RenderTab>>;
    /// Shut the engine down. No tabs may be opened afterwards.
    async fn close(&self) -> Result<()>;
    /// Number of tabs opened but not yet closed.
    fn active_tabs(&self) -> usize;
}

/// A single page context.
#[async_trait]
pub trait RenderTab: Send {
    async fn navigate(&mut self, url: &Url) -> Result<()>;
    /// Markup of the document after navigation, including script-inserted content
    /// where the engine executes scripts.
    async fn content(&mut self) -> Result<String>;
    /// Address of the loaded document after redirects, when the engine knows it.
    fn final_url(&self) -> Option<Url> {
        None
    }
    async fn close(self: Box<Self>) -> Result<()>;
}

pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml+xml")
}
