//! File-based configuration.
//!
//! Every section is optional; anything left out falls back to its defaults.
//!
//! ```toml
//! [budget]
//! max_depth = 2
//! politeness_delay_ms = 1500
//!
//! [http]
//! user_agent = "MyBot/1.0"
//!
//! [taxonomy]
//! catering = ["tacos", "food truck"]
//! ```

use crate::ingest::IngestOptions;
use crate::status::MAX_STATUS_TTL_SECS;
use anyhow::Result;
use folio_scanner::taxonomy::CategoryTaxonomy;
use folio_scanner::{CrawlBudget, HttpSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/folio/config.toml";

/// Upper bound for `http.max_crawl_delay_secs`.
pub const MAX_CRAWL_DELAY_CEILING_SECS: u64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// How long a status entry survives after its last update.
    pub ttl_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl StatusConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub budget: CrawlBudget,
    pub http: HttpSettings,
    pub ingest: IngestOptions,
    pub status: StatusConfig,
    /// Category name to keywords; replaces the built-in list for that category.
    pub taxonomy: BTreeMap<String, Vec<String>>,
}

/// Expands a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl FolioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: FolioConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the default location if it exists,
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(&expand_path(path)),
            None => {
                let default = expand_path(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reports every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if let Err(e) = self.budget.validate() {
            errors.push(e.to_string());
        }

        if self.http.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.http.robots_timeout_secs == 0 {
            errors.push("robots_timeout_secs must be positive".to_string());
        }
        if self.http.page_timeout_secs == 0 {
            errors.push("page_timeout_secs must be positive".to_string());
        }
        if self.http.max_body_bytes == 0 {
            errors.push("max_body_bytes must be positive".to_string());
        }
        if self.http.max_crawl_delay_secs > MAX_CRAWL_DELAY_CEILING_SECS {
            errors.push(format!(
                "max_crawl_delay_secs must be at most {}",
                MAX_CRAWL_DELAY_CEILING_SECS
            ));
        }

        if self.ingest.concurrency == 0 {
            errors.push("ingest concurrency must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.ingest.quality_threshold) {
            errors.push("ingest quality_threshold must be between 0.0 and 1.0".to_string());
        }

        if self.status.ttl_secs == 0 {
            errors.push("status ttl_secs must be positive".to_string());
        } else if self.status.ttl_secs > MAX_STATUS_TTL_SECS {
            errors.push(format!("status ttl_secs must be at most {}", MAX_STATUS_TTL_SECS));
        }

        for (category, keywords) in &self.taxonomy {
            if category.trim().is_empty() {
                errors.push("taxonomy category names must not be empty".to_string());
            }
            if keywords.iter().all(|k| k.trim().is_empty()) {
                errors.push(format!("taxonomy category '{}' has no keywords", category));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }

    /// Built-in categories with this file's overrides applied.
    pub fn taxonomy(&self) -> CategoryTaxonomy {
        let mut taxonomy = CategoryTaxonomy::default();
        let mut overrides = CategoryTaxonomy::empty();
        for (category, keywords) in &self.taxonomy {
            overrides.insert(category, keywords.clone());
        }
        taxonomy.merge(overrides);
        taxonomy
    }
}
