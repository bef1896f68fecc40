//! Per-business scrape status with expiry, and a single-flight guard.
//!
//! The store lives with whoever orchestrates scrapes. Entries expire a fixed
//! time after their last update; expiry is applied when an entry is read and
//! by [`ScrapeStatusStore::purge_expired`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Longest accepted entry lifetime.
pub const MAX_STATUS_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStatus {
    pub state: ScrapeState,
    pub started: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("A scrape is already running for {0}")]
    AlreadyRunning(String),
}

#[derive(Debug)]
struct Entry {
    status: ScrapeStatus,
    expires_at: Instant,
    /// Claim that owns this entry, if it was created by `try_begin`.
    claim: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ScrapeStatusStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    next_claim: Arc<AtomicU64>,
    ttl: Duration,
}

impl ScrapeStatusStore {
    /// `ttl` is capped at [`MAX_STATUS_TTL_SECS`].
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_claim: Arc::new(AtomicU64::new(1)),
            ttl: ttl.min(Duration::from_secs(MAX_STATUS_TTL_SECS)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        business_id: &str,
    ) -> Option<&'a mut Entry> {
        if entries
            .get(business_id)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            debug!("Status for {} expired", business_id);
            entries.remove(business_id);
        }
        entries.get_mut(business_id)
    }

    pub fn get(&self, business_id: &str) -> Option<ScrapeStatus> {
        let mut entries = self.lock();
        Self::live(&mut entries, business_id).map(|entry| entry.status.clone())
    }

    /// Records `state` for `business_id`, keeping the original start time if
    /// the entry is still live.
    pub fn set(&self, business_id: &str, state: ScrapeState, summary: Option<String>) {
        let mut entries = self.lock();
        self.write(&mut entries, business_id, state, summary);
    }

    fn write(
        &self,
        entries: &mut HashMap<String, Entry>,
        business_id: &str,
        state: ScrapeState,
        summary: Option<String>,
    ) {
        let now = Utc::now();
        let expires_at = Instant::now() + self.ttl;
        match Self::live(entries, business_id) {
            Some(entry) => {
                entry.status.state = state;
                entry.status.updated = now;
                entry.status.summary = summary;
                entry.expires_at = expires_at;
            }
            None => {
                entries.insert(
                    business_id.to_string(),
                    Entry {
                        status: ScrapeStatus {
                            state,
                            started: now,
                            updated: now,
                            summary,
                        },
                        expires_at,
                        claim: None,
                    },
                );
            }
        }
    }

    /// Writes a claim's final state unless a newer claim has taken the entry over.
    fn finish(&self, business_id: &str, claim: u64, state: ScrapeState, summary: Option<String>) {
        let mut entries = self.lock();
        if let Some(entry) = Self::live(&mut entries, business_id)
            && entry.claim.is_some_and(|owner| owner != claim)
        {
            debug!(
                "Claim {} on {} was superseded, not recording {:?}",
                claim, business_id, state
            );
            return;
        }
        self.write(&mut entries, business_id, state, summary);
    }

    /// Claims `business_id` for a new scrape. Refused while an unexpired
    /// `Running` entry exists.
    pub fn try_begin(&self, business_id: &str) -> Result<ScrapeGuard, StatusError> {
        let now = Utc::now();
        let mut entries = self.lock();
        if Self::live(&mut entries, business_id)
            .is_some_and(|entry| entry.status.state == ScrapeState::Running)
        {
            return Err(StatusError::AlreadyRunning(business_id.to_string()));
        }
        let claim = self.next_claim.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            business_id.to_string(),
            Entry {
                status: ScrapeStatus {
                    state: ScrapeState::Running,
                    started: now,
                    updated: now,
                    summary: None,
                },
                expires_at: Instant::now() + self.ttl,
                claim: Some(claim),
            },
        );
        Ok(ScrapeGuard {
            store: self.clone(),
            business_id: business_id.to_string(),
            claim,
            finished: false,
        })
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ScrapeStatusStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

/// Exclusive claim on one business's scrape. Marks the entry `Failed` if
/// dropped without being finished. Once the claim has expired and another
/// scrape has begun, the guard no longer writes.
#[derive(Debug)]
pub struct ScrapeGuard {
    store: ScrapeStatusStore,
    business_id: String,
    claim: u64,
    finished: bool,
}

impl ScrapeGuard {
    pub fn business_id(&self) -> &str {
        &self.business_id
    }

    pub fn complete(mut self, summary: impl Into<String>) {
        self.store.finish(
            &self.business_id,
            self.claim,
            ScrapeState::Completed,
            Some(summary.into()),
        );
        self.finished = true;
    }

    pub fn fail(mut self, error: impl Into<String>) {
        self.store.finish(
            &self.business_id,
            self.claim,
            ScrapeState::Failed,
            Some(error.into()),
        );
        self.finished = true;
    }
}

impl Drop for ScrapeGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.store.finish(
                &self.business_id,
                self.claim,
                ScrapeState::Failed,
                Some("scrape ended unexpectedly".to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_begin_is_refused_while_running() {
        let store = ScrapeStatusStore::default();
        let guard = store.try_begin("biz-1").unwrap();

        let err = store.try_begin("biz-1").unwrap_err();
        assert!(matches!(err, StatusError::AlreadyRunning(ref id) if id == "biz-1"));
        assert!(store.try_begin("biz-2").is_ok());

        guard.complete("3 images");
        let status = store.get("biz-1").unwrap();
        assert_eq!(status.state, ScrapeState::Completed);
        assert_eq!(status.summary.as_deref(), Some("3 images"));
        assert!(store.try_begin("biz-1").is_ok());
    }

    #[tokio::test]
    async fn test_dropped_guard_marks_failed() {
        let store = ScrapeStatusStore::default();
        {
            let _guard = store.try_begin("biz-1").unwrap();
        }
        assert_eq!(store.get("biz-1").unwrap().state, ScrapeState::Failed);
    }

    #[tokio::test]
    async fn test_fail_records_reason() {
        let store = ScrapeStatusStore::default();
        store.try_begin("biz-1").unwrap().fail("Crawling disallowed");
        let status = store.get("biz-1").unwrap();
        assert_eq!(status.state, ScrapeState::Failed);
        assert_eq!(status.summary.as_deref(), Some("Crawling disallowed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = ScrapeStatusStore::new(Duration::from_secs(60));
        store.set("biz-1", ScrapeState::Completed, None);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("biz-1").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("biz-1").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_running_entry_does_not_block() {
        let store = ScrapeStatusStore::new(Duration::from_secs(10));
        let stale = store.try_begin("biz-1").unwrap();
        std::mem::forget(stale);

        assert!(store.try_begin("biz-1").is_err());
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.try_begin("biz-1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtaken_guard_does_not_release_newer_claim() {
        let store = ScrapeStatusStore::new(Duration::from_secs(10));
        let slow = store.try_begin("biz-1").unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        let current = store.try_begin("biz-1").unwrap();
        slow.complete("late result");

        let status = store.get("biz-1").unwrap();
        assert_eq!(status.state, ScrapeState::Running);
        assert!(status.summary.is_none());
        assert!(store.try_begin("biz-1").is_err());

        current.complete("2 images");
        assert_eq!(store.get("biz-1").unwrap().summary.as_deref(), Some("2 images"));
        assert!(store.try_begin("biz-1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overtaken_guard_drop_is_ignored() {
        let store = ScrapeStatusStore::new(Duration::from_secs(10));
        let slow = store.try_begin("biz-1").unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        let _current = store.try_begin("biz-1").unwrap();

        drop(slow);
        assert_eq!(store.get("biz-1").unwrap().state, ScrapeState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_claim_still_records_when_not_overtaken() {
        let store = ScrapeStatusStore::new(Duration::from_secs(10));
        let slow = store.try_begin("biz-1").unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;

        slow.fail("page budget exhausted");
        assert_eq!(store.get("biz-1").unwrap().state, ScrapeState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_capped() {
        let store = ScrapeStatusStore::new(Duration::from_secs(u64::MAX));
        assert_eq!(store.ttl(), Duration::from_secs(MAX_STATUS_TTL_SECS));
        store.set("biz-1", ScrapeState::Completed, None);
        assert!(store.try_begin("biz-1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = ScrapeStatusStore::new(Duration::from_secs(10));
        store.set("old", ScrapeState::Completed, None);
        tokio::time::advance(Duration::from_secs(5)).await;
        store.set("new", ScrapeState::Completed, None);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("new").is_some());
    }

    #[tokio::test]
    async fn test_update_keeps_start_time() {
        let store = ScrapeStatusStore::default();
        store.set("biz-1", ScrapeState::Running, None);
        let started = store.get("biz-1").unwrap().started;
        store.set("biz-1", ScrapeState::Completed, Some("done".into()));

        let status = store.get("biz-1").unwrap();
        assert_eq!(status.started, started);
        assert!(status.updated >= started);
    }
}
