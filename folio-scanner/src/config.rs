use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "FolioBot/0.1 (+https://github.com/folio-scout/folio)";

/// Limits bounding a single crawl session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlBudget {
    pub max_depth: usize,
    pub max_pages_visited: usize,
    pub max_images_per_site: usize,
    pub max_links_per_level: usize,
    /// Applied before fetching any page beyond depth 0.
    pub politeness_delay_ms: u64,
    pub output_limit: usize,
    /// Candidates must score strictly above this to be selected.
    pub relevance_threshold: f64,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages_visited: 100,
            max_images_per_site: 50,
            max_links_per_level: 5,
            politeness_delay_ms: 1000,
            output_limit: 20,
            relevance_threshold: 0.7,
        }
    }
}

impl CrawlBudget {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages_visited = pages;
        self
    }

    pub fn with_max_images(mut self, images: usize) -> Self {
        self.max_images_per_site = images;
        self
    }

    pub fn with_max_links_per_level(mut self, links: usize) -> Self {
        self.max_links_per_level = links;
        self
    }

    pub fn with_politeness_delay_ms(mut self, delay_ms: u64) -> Self {
        self.politeness_delay_ms = delay_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.max_pages_visited == 0 {
            errors.push("max_pages_visited must be positive");
        }
        if self.output_limit == 0 {
            errors.push("output_limit must be positive");
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            errors.push("relevance_threshold must be between 0.0 and 1.0");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScanError::InvalidBudget(errors.join("; ")))
        }
    }
}

/// Transport settings shared by the compliance gate and the HTTP renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub robots_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub max_body_bytes: usize,
    /// Stretch the politeness delay to the site's `Crawl-delay` when it is longer.
    pub honor_crawl_delay: bool,
    /// Ceiling applied to a site's `Crawl-delay` before it is honored.
    pub max_crawl_delay_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            robots_timeout_secs: 5,
            page_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
            honor_crawl_delay: true,
            max_crawl_delay_secs: 60,
        }
    }
}

impl HttpSettings {
    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn max_crawl_delay(&self) -> Duration {
        Duration::from_secs(self.max_crawl_delay_secs)
    }
}
