//! Hand-off of selected images to durable storage.
//!
//! Downloading, validating and storing image bytes belongs to an
//! [`ImageStore`] implementation supplied by the caller. This module only
//! decides which images go, and paces them in small concurrent batches.

use async_trait::async_trait;
use folio_scanner::ImageCandidate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResult {
    pub fn stored(storage_url: impl Into<String>, storage_path: impl Into<String>) -> Self {
        Self {
            success: true,
            storage_url: Some(storage_url.into()),
            storage_path: Some(storage_path.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn ingest(&self, business_id: &str, image: &ImageCandidate) -> IngestResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub max_images: usize,
    /// Images scoring below this are not stored.
    pub quality_threshold: f64,
    /// Images stored at once within a batch.
    pub concurrency: usize,
    /// Pause between batches.
    pub batch_delay_ms: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_images: 20,
            quality_threshold: 0.7,
            concurrency: 3,
            batch_delay_ms: 1000,
        }
    }
}

impl IngestOptions {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedImage {
    pub source_url: String,
    pub storage_url: Option<String>,
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub saved_count: usize,
    pub saved_images: Vec<SavedImage>,
    /// One entry per attempted image, in submission order.
    pub results: Vec<IngestResult>,
}

pub struct IngestWorkerPool {
    store: Arc<dyn ImageStore>,
    options: IngestOptions,
}

impl IngestWorkerPool {
    pub fn new(store: Arc<dyn ImageStore>, options: IngestOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Images that would be submitted: scored at or above the quality
    /// threshold, in the given order, at most `max_images`.
    pub fn eligible<'a>(&self, images: &'a [ImageCandidate]) -> Vec<&'a ImageCandidate> {
        images
            .iter()
            .filter(|image| {
                image
                    .relevance_score()
                    .is_some_and(|score| score >= self.options.quality_threshold)
            })
            .take(self.options.max_images)
            .collect()
    }

    pub async fn ingest_all(&self, business_id: &str, images: &[ImageCandidate]) -> IngestSummary {
        let eligible = self.eligible(images);
        let batch_size = self.options.concurrency.max(1);
        info!(
            "Ingesting {} of {} images for {} in batches of {}",
            eligible.len(),
            images.len(),
            business_id,
            batch_size
        );

        let mut summary = IngestSummary::default();
        let batch_count = eligible.len().div_ceil(batch_size);

        for (index, batch) in eligible.chunks(batch_size).enumerate() {
            debug!("Batch {}/{} ({} images)", index + 1, batch_count, batch.len());
            let results = join_all(
                batch
                    .iter()
                    .map(|image| self.store.ingest(business_id, image)),
            )
            .await;

            for (image, result) in batch.iter().zip(results) {
                if result.success {
                    summary.saved_count += 1;
                    summary.saved_images.push(SavedImage {
                        source_url: image.source_url.clone(),
                        storage_url: result.storage_url.clone(),
                        storage_path: result.storage_path.clone(),
                    });
                } else {
                    warn!(
                        "Failed to store {}: {}",
                        image.source_url,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                summary.results.push(result);
            }

            if index + 1 < batch_count && !self.options.batch_delay().is_zero() {
                tokio::time::sleep(self.options.batch_delay()).await;
            }
        }

        info!(
            "Stored {}/{} images for {}",
            summary.saved_count,
            summary.results.len(),
            business_id
        );
        summary
    }
}
