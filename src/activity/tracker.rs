use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use uuid::Uuid;

use super::models::*;
use super::streak::{activity_calendar, daily_progress, derive_streak};
use crate::clock::check_day_range;
use crate::config::GoalConfig;
use crate::error::{Result, SchedulerError};
use crate::storage::ActivityLog;

/// Records study events and answers streak and goal queries for learners.
///
/// Nothing is cached: every query re-reads the log and derives its answer.
pub struct ActivityTracker {
    log: Arc<dyn ActivityLog>,
    goals: GoalConfig,
    offset: FixedOffset,
}

impl ActivityTracker {
    pub fn new(log: Arc<dyn ActivityLog>, goals: GoalConfig) -> Self {
        Self {
            log,
            goals,
            offset: Utc.fix(),
        }
    }

    /// Learner-local day boundary
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn goals(&self) -> &GoalConfig {
        &self.goals
    }

    /// Append a study event. Future-dated and zero-quantity events are rejected.
    pub async fn record(&self, event: &ActivityEvent, now: DateTime<Utc>) -> Result<()> {
        if event.timestamp > now {
            return Err(SchedulerError::InvalidTimestamp(format!(
                "event at {} is after the current time {}",
                event.timestamp, now
            )));
        }
        if event.quantity == 0 {
            return Err(SchedulerError::InvalidEvent(format!(
                "{:?} event at {} has zero quantity",
                event.kind, event.timestamp
            )));
        }

        self.log.ensure_learner(event.learner_id).await?;
        self.log.append(event).await?;
        log::debug!(
            "Recorded {:?} x{} for learner {}",
            event.kind,
            event.quantity,
            event.learner_id
        );
        Ok(())
    }

    pub async fn events(&self, learner_id: Uuid) -> Result<Vec<ActivityEvent>> {
        self.log.ensure_learner(learner_id).await?;
        self.log.events(learner_id).await
    }

    pub async fn streak(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<StreakStatus> {
        let events = self.events(learner_id).await?;
        Ok(derive_streak(&events, now, &self.offset))
    }

    pub async fn progress(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<DailyProgress> {
        let events = self.events(learner_id).await?;
        Ok(daily_progress(&events, &self.goals, now, &self.offset))
    }

    /// The last `days` calendar days, ending today
    pub async fn calendar(&self, learner_id: Uuid, now: DateTime<Utc>, days: u32) -> Result<Vec<CalendarDay>> {
        check_day_range(days)?;
        let events = self.events(learner_id).await?;
        let today = now.with_timezone(&self.offset).date_naive();
        let from = today
            .checked_sub_signed(Duration::days(days.saturating_sub(1) as i64))
            .ok_or_else(|| SchedulerError::InvalidTimestamp(format!("{} days before {} is out of range", days, today)))?;
        Ok(activity_calendar(&events, from, today, now, &self.offset))
    }

    /// Streak and goal progress from one read of the log
    pub async fn snapshot(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<ActivitySnapshot> {
        let events = self.events(learner_id).await?;
        Ok(ActivitySnapshot {
            streak: derive_streak(&events, now, &self.offset),
            progress: daily_progress(&events, &self.goals, now, &self.offset),
        })
    }
}
