//! Scheduler facade
//!
//! The only writer of schedule state. Every operation takes `now` from the
//! caller; nothing here reads a clock.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use uuid::Uuid;

use super::algorithm::{Difficulty, IntervalPolicy};
use super::models::{ForecastDay, ReviewStats};
use crate::clock::check_day_range;
use crate::activity::{ActivityEvent, ActivityKind};
use crate::error::{Result, SchedulerError};
use crate::storage::{ActivityLog, ItemKey, ItemStore, RecallOutcome, ScheduleEntry};

/// Attempts at a compare-and-swap write before giving up with `Conflict`
const MAX_WRITE_ATTEMPTS: u32 = 5;

pub struct Scheduler {
    store: Arc<dyn ItemStore>,
    activity: Arc<dyn ActivityLog>,
    policy: IntervalPolicy,
    offset: FixedOffset,
}

impl Scheduler {
    pub fn new(store: Arc<dyn ItemStore>, activity: Arc<dyn ActivityLog>, policy: IntervalPolicy) -> Self {
        Self {
            store,
            activity,
            policy,
            offset: Utc.fix(),
        }
    }

    /// Day boundary used by `review_stats` and `forecast`
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn policy(&self) -> &IntervalPolicy {
        &self.policy
    }

    /// Record one review of `item`.
    ///
    /// Creates the entry on first exposure. Appends one activity event of
    /// the item's kind once the schedule write has committed. A failed append
    /// is logged; the committed entry is still returned.
    pub async fn record_review(
        &self,
        learner_id: Uuid,
        item: &ItemKey,
        difficulty: Difficulty,
        now: DateTime<Utc>,
        recall: Option<bool>,
    ) -> Result<ScheduleEntry> {
        self.store.ensure_learner(learner_id).await?;

        let mut attempt = 1;
        let entry = loop {
            let current = self.store.get(learner_id, item).await?;
            let expected = current.as_ref().map(|e| e.revision);
            let mut entry = current.unwrap_or_else(|| ScheduleEntry::unreviewed(learner_id, item.clone(), now));
            self.apply_review(&mut entry, difficulty, now, recall);

            match self.store.upsert(&entry, expected).await {
                Ok(stored) => break stored,
                Err(SchedulerError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    log::debug!("Retrying review of {} after conflict: {}", item, reason);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        // The schedule write has committed; report it even if the event is lost
        let event = ActivityEvent::once(learner_id, now, ActivityKind::for_review(item.kind));
        if let Err(e) = self.activity.append(&event).await {
            log::warn!(
                "Review of {} for learner {} saved, but its activity event was not: {}",
                item,
                learner_id,
                e
            );
        }

        log::debug!(
            "Learner {} rated {} as {}; next review at {} (review #{})",
            learner_id,
            item,
            difficulty,
            entry.next_review_at,
            entry.review_count
        );
        Ok(entry)
    }

    /// `record_review` for a raw 0-3 rating
    pub async fn record_rating(
        &self,
        learner_id: Uuid,
        item: &ItemKey,
        rating: i64,
        now: DateTime<Utc>,
    ) -> Result<ScheduleEntry> {
        let difficulty = Difficulty::try_from(rating)?;
        self.record_review(learner_id, item, difficulty, now, None).await
    }

    fn apply_review(&self, entry: &mut ScheduleEntry, difficulty: Difficulty, now: DateTime<Utc>, recall: Option<bool>) {
        entry.review_count = entry.review_count.saturating_add(1);

        if let Some(recalled) = recall {
            let at = entry.recall_history.partition_point(|r| r.at <= now);
            entry.recall_history.insert(at, RecallOutcome { at: now, recalled });
        }

        // A review stamped later than this one already won; keep its schedule
        if entry.last_reviewed_at.map_or(false, |last| last > now) {
            return;
        }

        entry.difficulty = difficulty;
        entry.last_reviewed_at = Some(now);
        entry.next_review_at = self.policy.next_review_at(difficulty, now);
    }

    /// Entries due at `now`, hardest first, then longest overdue
    pub async fn get_due_items(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
        self.store.ensure_learner(learner_id).await?;
        self.store.query_due(Some(learner_id), now).await
    }

    /// Create due-now entries for candidates that have none. Existing
    /// entries are left untouched. Returns the entries created.
    pub async fn sync_missing_schedules(
        &self,
        learner_id: Uuid,
        candidates: &[ItemKey],
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduleEntry>> {
        self.store.ensure_learner(learner_id).await?;

        let unique: BTreeSet<&ItemKey> = candidates.iter().collect();
        let mut created = Vec::new();

        for item in unique {
            if self.store.get(learner_id, item).await?.is_some() {
                continue;
            }

            let entry = ScheduleEntry::unreviewed(learner_id, item.clone(), now);
            match self.store.upsert(&entry, None).await {
                Ok(stored) => created.push(stored),
                // Created concurrently; it exists, which is all we need
                Err(SchedulerError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        if !created.is_empty() {
            log::debug!("Created {} schedule entries for learner {}", created.len(), learner_id);
        }
        Ok(created)
    }

    /// Discard the schedule state of `item` so it behaves as never reviewed.
    ///
    /// The entry is replaced by a fresh unreviewed one due at `now`. An item
    /// with no entry is left alone. Returns whether there was prior state.
    pub async fn uncomplete(&self, learner_id: Uuid, item: &ItemKey, now: DateTime<Utc>) -> Result<bool> {
        self.store.ensure_learner(learner_id).await?;

        let mut attempt = 1;
        loop {
            let Some(current) = self.store.get(learner_id, item).await? else {
                return Ok(false);
            };
            let fresh = ScheduleEntry::unreviewed(learner_id, item.clone(), now);

            match self.store.upsert(&fresh, Some(current.revision)).await {
                Ok(_) => {
                    log::debug!("Reset schedule of {} for learner {}", item, learner_id);
                    return Ok(true);
                }
                Err(SchedulerError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    log::debug!("Retrying reset of {} after conflict: {}", item, reason);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get_entry(&self, learner_id: Uuid, item: &ItemKey) -> Result<Option<ScheduleEntry>> {
        self.store.ensure_learner(learner_id).await?;
        self.store.get(learner_id, item).await
    }

    pub async fn list_entries(&self, learner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        self.store.ensure_learner(learner_id).await?;
        self.store.list(learner_id).await
    }

    pub async fn review_stats(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<ReviewStats> {
        let entries = self.list_entries(learner_id).await?;
        let today = now.with_timezone(&self.offset).date_naive();

        let mut stats = ReviewStats {
            total_items: entries.len(),
            ..Default::default()
        };
        let mut recalls = 0usize;
        let mut recalled = 0usize;

        for entry in &entries {
            match entry.difficulty {
                Difficulty::Hard => stats.hard_items += 1,
                Difficulty::Medium => stats.medium_items += 1,
                Difficulty::Easy => stats.easy_items += 1,
                Difficulty::Wait => stats.waiting_items += 1,
            }

            if entry.is_due(now) {
                stats.due_items += 1;
            }

            match entry.last_reviewed_at {
                None => stats.never_reviewed += 1,
                Some(at) if at.with_timezone(&self.offset).date_naive() == today => stats.reviewed_today += 1,
                Some(_) => {}
            }

            stats.total_reviews += entry.review_count as u64;
            recalls += entry.recall_history.len();
            recalled += entry.recall_history.iter().filter(|r| r.recalled).count();
        }

        if recalls > 0 {
            stats.recall_rate = Some(recalled as f64 / recalls as f64);
        }
        Ok(stats)
    }

    /// Items becoming due on each of the next `days` calendar days,
    /// starting today. Overdue items count toward today.
    pub async fn forecast(&self, learner_id: Uuid, now: DateTime<Utc>, days: u32) -> Result<Vec<ForecastDay>> {
        check_day_range(days)?;
        let entries = self.list_entries(learner_id).await?;
        let today = now.with_timezone(&self.offset).date_naive();

        let mut forecast: Vec<ForecastDay> = today
            .iter_days()
            .take(days as usize)
            .map(|date| ForecastDay { date, due_count: 0 })
            .collect();

        for entry in &entries {
            let due_day = entry.next_review_at.with_timezone(&self.offset).date_naive().max(today);
            let index = (due_day - today).num_days() as usize;
            if let Some(day) = forecast.get_mut(index) {
                day.due_count += 1;
            }
        }

        Ok(forecast)
    }
}
