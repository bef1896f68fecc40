use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};

/// An image discovered on a crawled page, optionally enriched with a relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCandidate {
    #[serde(rename = "src")]
    pub source_url: String,
    pub page_url: String,
    #[serde(rename = "alt")]
    pub alt_text: String,
    #[serde(rename = "title")]
    pub title_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(rename = "context")]
    pub surrounding_context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevance_score: Option<f64>,
}

impl ImageCandidate {
    pub fn new(source_url: String, page_url: String) -> Self {
        Self {
            source_url,
            page_url,
            alt_text: String::new(),
            title_text: String::new(),
            width: None,
            height: None,
            surrounding_context: String::new(),
            relevance_score: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = alt.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title_text = title.into();
        self
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.surrounding_context = context.into();
        self
    }

    pub fn relevance_score(&self) -> Option<f64> {
        self.relevance_score
    }

    /// Records the score. A candidate is scored exactly once; later attempts fail.
    pub fn set_score(&mut self, score: f64) -> Result<()> {
        if self.relevance_score.is_some() {
            return Err(ScanError::ScoringFailure(format!(
                "{} (already scored)",
                self.source_url
            )));
        }
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(ScanError::ScoringFailure(format!(
                "{} (score {} out of range)",
                self.source_url, score
            )));
        }
        self.relevance_score = Some(score);
        Ok(())
    }
}

/// Lifecycle of a crawl session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Why a completed session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    FrontierExhausted,
    PageBudgetReached,
    ImageBudgetReached,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub links_enqueued: usize,
    pub links_over_cap: usize,
    pub items_unresolved: usize,
    pub images_collected: usize,
    pub duplicate_images: usize,
}

/// Everything a completed session produced, before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub start_url: String,
    pub visited: Vec<String>,
    pub images: Vec<ImageCandidate>,
    pub stats: CrawlStats,
    pub termination: Termination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_set_once() {
        let mut candidate = ImageCandidate::new(
            "https://example.com/a.jpg".into(),
            "https://example.com/".into(),
        );
        assert_eq!(candidate.relevance_score(), None);
        candidate.set_score(0.5).unwrap();
        assert_eq!(candidate.relevance_score(), Some(0.5));

        let err = candidate.set_score(0.9).unwrap_err();
        assert!(matches!(err, ScanError::ScoringFailure(_)));
        assert_eq!(candidate.relevance_score(), Some(0.5));
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut candidate = ImageCandidate::new("a".into(), "b".into());
        assert!(candidate.set_score(1.2).is_err());
        assert!(candidate.set_score(f64::NAN).is_err());
        assert_eq!(candidate.relevance_score(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let mut candidate = ImageCandidate::new(
            "https://example.com/a.jpg".into(),
            "https://example.com/gallery".into(),
        )
        .with_alt("Wedding portrait")
        .with_dimensions(Some(800), None)
        .with_context("Our gallery");
        candidate.set_score(0.8).unwrap();

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["src"], "https://example.com/a.jpg");
        assert_eq!(json["pageUrl"], "https://example.com/gallery");
        assert_eq!(json["alt"], "Wedding portrait");
        assert_eq!(json["title"], "");
        assert_eq!(json["width"], 800);
        assert!(json.get("height").is_none());
        assert_eq!(json["context"], "Our gallery");
        assert_eq!(json["relevanceScore"], 0.8);
    }
}
