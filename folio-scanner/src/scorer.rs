//! Heuristic relevance scoring for image candidates.
//!
//! Signals are additive and evaluated independently, then the sum is clamped
//! to [0, 1]. Weights are kept in hundredths so that identical inputs always
//! produce bit-identical scores.

use crate::result::ImageCandidate;
use crate::taxonomy::KeywordSet;

pub const MIN_DIMENSIONS: (u32, u32) = (400, 300);
pub const LARGE_DIMENSIONS: (u32, u32) = (800, 600);

pub const SIZE_POINTS: i32 = 30;
pub const LARGE_SIZE_POINTS: i32 = 20;
pub const ALT_LENGTH_POINTS: i32 = 20;
pub const ALT_KEYWORD_POINTS: i32 = 30;
pub const TITLE_LENGTH_POINTS: i32 = 10;
pub const TITLE_KEYWORD_POINTS: i32 = 20;
pub const CONTEXT_KEYWORD_POINTS: i32 = 20;
pub const NEGATIVE_TERM_POINTS: i32 = 10;

pub const MIN_ALT_CHARS: usize = 10;
pub const MIN_TITLE_CHARS: usize = 5;

pub const NEGATIVE_TERMS: &[&str] = &["logo", "icon", "banner", "advertisement", "social", "share"];

/// Per-signal contributions, in hundredths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub size: i32,
    pub alt: i32,
    pub title: i32,
    pub context: i32,
    pub penalty: i32,
}

impl ScoreBreakdown {
    pub fn total_points(&self) -> i32 {
        (self.size + self.alt + self.title + self.context - self.penalty).clamp(0, 100)
    }

    pub fn score(&self) -> f64 {
        f64::from(self.total_points()) / 100.0
    }
}

pub fn breakdown(candidate: &ImageCandidate, keywords: &KeywordSet) -> ScoreBreakdown {
    let mut parts = ScoreBreakdown::default();

    if let (Some(width), Some(height)) = (candidate.width, candidate.height)
        && width >= MIN_DIMENSIONS.0
        && height >= MIN_DIMENSIONS.1
    {
        parts.size += SIZE_POINTS;
        if width >= LARGE_DIMENSIONS.0 && height >= LARGE_DIMENSIONS.1 {
            parts.size += LARGE_SIZE_POINTS;
        }
    }

    if candidate.alt_text.chars().count() > MIN_ALT_CHARS {
        parts.alt += ALT_LENGTH_POINTS;
        if keywords.matches(&candidate.alt_text) {
            parts.alt += ALT_KEYWORD_POINTS;
        }
    }

    if candidate.title_text.chars().count() > MIN_TITLE_CHARS {
        parts.title += TITLE_LENGTH_POINTS;
        if keywords.matches(&candidate.title_text) {
            parts.title += TITLE_KEYWORD_POINTS;
        }
    }

    if keywords.matches(&candidate.surrounding_context) {
        parts.context += CONTEXT_KEYWORD_POINTS;
    }

    let combined = format!(
        "{} {} {}",
        candidate.alt_text, candidate.title_text, candidate.surrounding_context
    )
    .to_lowercase();
    let occurrences: usize = NEGATIVE_TERMS
        .iter()
        .map(|term| combined.matches(term).count())
        .sum();
    parts.penalty = NEGATIVE_TERM_POINTS.saturating_mul(i32::try_from(occurrences).unwrap_or(i32::MAX));

    parts
}

/// Relevance of `candidate` to the categories behind `keywords`, in [0, 1].
pub fn score(candidate: &ImageCandidate, keywords: &KeywordSet) -> f64 {
    breakdown(candidate, keywords).score()
}
