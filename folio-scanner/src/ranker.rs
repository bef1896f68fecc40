use crate::result::ImageCandidate;
use crate::scorer;
use crate::taxonomy::KeywordSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Final selection from one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    /// Raw candidates considered, before filtering.
    pub total_images_found: usize,
    pub selected: Vec<ImageCandidate>,
    pub scoring_failures: usize,
}

#[derive(Debug, Clone)]
pub struct Ranker {
    threshold: f64,
    limit: usize,
}

impl Ranker {
    pub fn new(threshold: f64, limit: usize) -> Self {
        Self { threshold, limit }
    }

    /// Scores each candidate once. Candidates that cannot be scored are dropped and counted.
    pub fn score_all(
        &self,
        candidates: Vec<ImageCandidate>,
        keywords: &KeywordSet,
    ) -> (Vec<ImageCandidate>, usize) {
        let mut scored = Vec::with_capacity(candidates.len());
        let mut failures = 0;
        for mut candidate in candidates {
            let score = scorer::score(&candidate, keywords);
            match candidate.set_score(score) {
                Ok(()) => scored.push(candidate),
                Err(e) => {
                    warn!("Excluding candidate: {}", e);
                    failures += 1;
                }
            }
        }
        (scored, failures)
    }

    /// Keeps candidates scoring above the threshold, best first, discovery order on ties.
    pub fn select(&self, scored: Vec<ImageCandidate>) -> Vec<ImageCandidate> {
        let mut selected: Vec<ImageCandidate> = scored
            .into_iter()
            .filter(|c| c.relevance_score().is_some_and(|s| s > self.threshold))
            .collect();

        // Vec::sort_by is stable
        selected.sort_by(|a, b| {
            b.relevance_score()
                .partial_cmp(&a.relevance_score())
                .unwrap_or(Ordering::Equal)
        });
        selected.truncate(self.limit);
        selected
    }

    pub fn rank(&self, candidates: Vec<ImageCandidate>, keywords: &KeywordSet) -> Ranking {
        let total_images_found = candidates.len();
        let (scored, scoring_failures) = self.score_all(candidates, keywords);
        let selected = self.select(scored);
        debug!(
            "Selected {} of {} images (threshold {})",
            selected.len(),
            total_images_found,
            self.threshold
        );
        Ranking {
            total_images_found,
            selected,
            scoring_failures,
        }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(0.7, 20)
    }
}
