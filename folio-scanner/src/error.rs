use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("Crawling disallowed by {0}")]
    ComplianceDenied(String),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Page fetch timed out after {secs}s: {url}")]
    PageFetchTimeout { url: String, secs: u64 },

    #[error("Page fetch failed for {url}: {reason}")]
    PageFetchFailure { url: String, reason: String },

    #[error("Could not resolve link '{0}'")]
    LinkResolution(String),

    #[error("Could not resolve image '{0}'")]
    ImageResolution(String),

    #[error("Scoring failed for {0}")]
    ScoringFailure(String),

    #[error("Invalid crawl budget: {0}")]
    InvalidBudget(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Serializable classification of a [`ScanError`], reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidStartUrl,
    ComplianceDenied,
    Cancelled,
    RendererUnavailable,
    PageFetchTimeout,
    PageFetchFailure,
    LinkResolutionFailure,
    ImageResolutionFailure,
    ScoringFailure,
    InvalidBudget,
    Transport,
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::InvalidStartUrl(_) => ErrorKind::InvalidStartUrl,
            ScanError::ComplianceDenied(_) => ErrorKind::ComplianceDenied,
            ScanError::Cancelled => ErrorKind::Cancelled,
            ScanError::RendererUnavailable(_) => ErrorKind::RendererUnavailable,
            ScanError::PageFetchTimeout { .. } => ErrorKind::PageFetchTimeout,
            ScanError::PageFetchFailure { .. } => ErrorKind::PageFetchFailure,
            ScanError::LinkResolution(_) => ErrorKind::LinkResolutionFailure,
            ScanError::ImageResolution(_) => ErrorKind::ImageResolutionFailure,
            ScanError::ScoringFailure(_) => ErrorKind::ScoringFailure,
            ScanError::InvalidBudget(_) => ErrorKind::InvalidBudget,
            ScanError::HttpError(_) | ScanError::UrlParse(_) | ScanError::IoError(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// Whether this error ends the whole crawl session rather than a single page or item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidStartUrl
                | ErrorKind::ComplianceDenied
                | ErrorKind::Cancelled
                | ErrorKind::RendererUnavailable
                | ErrorKind::InvalidBudget
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
