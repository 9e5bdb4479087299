//! In-memory download ledger.
//!
//! The ledger is the process-lifetime registry of download records. It is
//! an owned store instance injected into the orchestrator at construction
//! so multiple instances can coexist in tests; it is never a module-level
//! singleton. Callers always receive cloned snapshots, never a live
//! reference into the map, so state transitions stay under the
//! orchestrator's control.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Persistable status of a download record. Transitions only move forward
/// out of `Processing`; a terminal record never changes status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Processing,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DownloadStatus::Processing)
    }
}

/// One download request as tracked by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    /// Unique, strictly increasing, never reused.
    pub id: u64,
    /// The original submitted URL, not normalized.
    pub url: String,
    /// Requested quality label, immutable after creation.
    pub quality: String,
    pub status: DownloadStatus,
    /// 0..=100, intended to be monotonically non-decreasing.
    pub progress: u8,
    /// Set once a terminal state is reached.
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update merged into an existing record; absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct DownloadUpdate {
    pub status: Option<DownloadStatus>,
    pub progress: Option<u8>,
    pub filename: Option<String>,
}

impl DownloadUpdate {
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed(filename: impl Into<String>) -> Self {
        Self {
            status: Some(DownloadStatus::Completed),
            progress: Some(100),
            filename: Some(filename.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(DownloadStatus::Failed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, DownloadRecord>,
}

/// In-process registry of download records keyed by a monotonically
/// increasing identifier. The ledger is the sole writer of `id` and
/// `created_at`.
#[derive(Debug, Default)]
pub struct DownloadLedger {
    inner: Mutex<Inner>,
}

impl DownloadLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                records: BTreeMap::new(),
            }),
        })
    }

    /// Create a new record with status `processing`, progress 0 and no
    /// filename. Ids start at 1 and are never reused, even after deletion.
    pub fn create(&self, url: impl Into<String>, quality: impl Into<String>) -> DownloadRecord {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let record = DownloadRecord {
            id,
            url: url.into(),
            quality: quality.into(),
            status: DownloadStatus::Processing,
            progress: 0,
            filename: None,
            created_at: Utc::now(),
        };
        inner.records.insert(id, record.clone());
        record
    }

    /// Snapshot of a record, if present.
    pub fn get(&self, id: u64) -> Option<DownloadRecord> {
        self.inner.lock().records.get(&id).cloned()
    }

    /// Merge a partial update into an existing record. An unknown id is
    /// an absence signal, not an error: nothing is mutated and `None` is
    /// returned.
    pub fn update(&self, id: u64, update: DownloadUpdate) -> Option<DownloadRecord> {
        let mut inner = self.inner.lock();
        let record = inner.records.get_mut(&id)?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(progress) = update.progress {
            record.progress = progress.min(100);
        }
        if let Some(filename) = update.filename {
            record.filename = Some(filename);
        }

        Some(record.clone())
    }

    /// Remove a record. Returns whether one existed.
    pub fn delete(&self, id: u64) -> bool {
        self.inner.lock().records.remove(&id).is_some()
    }

    /// Snapshot of all records in insertion (id) order.
    pub fn list_all(&self) -> Vec<DownloadRecord> {
        self.inner.lock().records.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sets_initial_fields() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "720p");

        assert_eq!(record.id, 1);
        assert_eq!(record.status, DownloadStatus::Processing);
        assert_eq!(record.progress, 0);
        assert_eq!(record.filename, None);

        let fetched = ledger.get(record.id).unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn ids_are_strictly_increasing_and_never_reused() {
        let ledger = DownloadLedger::new();
        let ids: Vec<u64> = (0..5)
            .map(|_| ledger.create("https://youtu.be/abc", "best").id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        assert!(ledger.delete(3));
        let next = ledger.create("https://youtu.be/abc", "best").id;
        assert_eq!(next, 6);
    }

    #[test]
    fn update_merges_partial_fields() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "480p");

        let updated = ledger
            .update(record.id, DownloadUpdate::progress(40))
            .unwrap();
        assert_eq!(updated.progress, 40);
        assert_eq!(updated.status, DownloadStatus::Processing);
        assert_eq!(updated.filename, None);

        let updated = ledger
            .update(record.id, DownloadUpdate::completed("video.mp4"))
            .unwrap();
        assert_eq!(updated.status, DownloadStatus::Completed);
        assert_eq!(updated.progress, 100);
        assert_eq!(updated.filename.as_deref(), Some("video.mp4"));
    }

    #[test]
    fn update_unknown_id_returns_none_and_mutates_nothing() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "360p");

        assert!(ledger.update(999, DownloadUpdate::progress(50)).is_none());
        assert_eq!(ledger.get(record.id).unwrap(), record);
    }

    #[test]
    fn delete_reports_existence() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "best");

        assert!(ledger.delete(record.id));
        assert!(!ledger.delete(record.id));
        assert!(ledger.get(record.id).is_none());
    }

    #[test]
    fn list_all_preserves_insertion_order() {
        let ledger = DownloadLedger::new();
        for _ in 0..3 {
            ledger.create("https://youtu.be/abc", "best");
        }
        let ids: Vec<u64> = ledger.list_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn get_is_idempotent() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "1080p");

        let a = ledger.get(record.id).unwrap();
        let b = ledger.get(record.id).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn progress_is_capped_at_100() {
        let ledger = DownloadLedger::new();
        let record = ledger.create("https://youtu.be/abc", "best");
        let updated = ledger
            .update(record.id, DownloadUpdate::progress(250))
            .unwrap();
        assert_eq!(updated.progress, 100);
    }
}
