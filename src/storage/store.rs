//! Storage traits for schedule state and the activity log.
//!
//! The scheduler and tracker talk to storage only through these traits, so
//! any backend (hosted database, JSON files, memory) can sit behind them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{ItemKey, ScheduleEntry};
use crate::activity::ActivityEvent;
use crate::error::Result;

#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Fail with `NotFound` if the store knows learners and this one is unknown
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()>;

    async fn get(&self, learner_id: Uuid, item: &ItemKey) -> Result<Option<ScheduleEntry>>;

    /// Compare-and-swap write.
    ///
    /// `expected_revision` is the revision the caller read, or `None` if it
    /// read nothing. A mismatch fails with `Conflict` and writes nothing.
    /// Returns the stored entry with its new revision.
    async fn upsert(&self, entry: &ScheduleEntry, expected_revision: Option<u64>) -> Result<ScheduleEntry>;

    /// Returns whether an entry was removed
    async fn delete(&self, learner_id: Uuid, item: &ItemKey) -> Result<bool>;

    /// All entries for a learner, in item order
    async fn list(&self, learner_id: Uuid) -> Result<Vec<ScheduleEntry>>;

    /// Entries with `next_review_at <= now`, for one learner or for everyone,
    /// sorted by [`due_order`](super::models::due_order)
    async fn query_due(&self, learner_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>>;
}

#[async_trait::async_trait]
pub trait ActivityLog: Send + Sync {
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()>;

    async fn append(&self, event: &ActivityEvent) -> Result<()>;

    /// Every event for a learner, oldest first
    async fn events(&self, learner_id: Uuid) -> Result<Vec<ActivityEvent>>;
}

/// Shared CAS check used by the bundled backends
pub(crate) fn check_revision(
    current: Option<&ScheduleEntry>,
    expected_revision: Option<u64>,
    item: &ItemKey,
) -> Result<u64> {
    use crate::error::SchedulerError;

    match (current.map(|e| e.revision), expected_revision) {
        (None, None) => Ok(1),
        (Some(stored), Some(expected)) if stored == expected => Ok(stored + 1),
        (stored, expected) => Err(SchedulerError::Conflict(format!(
            "{}: expected revision {:?}, found {:?}",
            item, expected, stored
        ))),
    }
}
