use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::review::Difficulty;
use crate::storage::ScheduleEntry;

/// What one learner has waiting, handed to the delivery channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    pub learner_id: Uuid,
    pub due_count: usize,
    pub hard: usize,
    pub medium: usize,
    pub easy: usize,
    pub wait: usize,
    /// Rounded up
    pub estimated_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_due_at: Option<DateTime<Utc>>,
}

impl DueSummary {
    pub fn from_entries(learner_id: Uuid, entries: &[ScheduleEntry], seconds_per_item: u32) -> Self {
        let count_of = |d: Difficulty| entries.iter().filter(|e| e.difficulty == d).count();
        let total_secs = entries.len() as u64 * seconds_per_item as u64;

        Self {
            learner_id,
            due_count: entries.len(),
            hard: count_of(Difficulty::Hard),
            medium: count_of(Difficulty::Medium),
            easy: count_of(Difficulty::Easy),
            wait: count_of(Difficulty::Wait),
            estimated_minutes: total_secs.div_ceil(60) as u32,
            oldest_due_at: entries.iter().map(|e| e.next_review_at).min(),
        }
    }

    /// One-line message, e.g. "5 reviews due (2 hard, 3 new) - about 3 min"
    pub fn headline(&self) -> String {
        let noun = if self.due_count == 1 { "review" } else { "reviews" };

        let breakdown: Vec<String> = [
            (self.hard, "hard"),
            (self.medium, "medium"),
            (self.easy, "easy"),
            (self.wait, "new"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();

        format!(
            "{} {} due ({}) - about {} min",
            self.due_count,
            noun,
            breakdown.join(", "),
            self.estimated_minutes
        )
    }
}

/// Answer from a delivery channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            reason: None,
        }
    }

    /// The channel chose not to deliver (opted out, rate limited, ...)
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            delivered: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Delivered,
    Skipped,
    Failed,
    TimedOut,
}

/// Result of handing one learner's summary to the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub learner_id: Uuid,
    pub channel: String,
    pub status: DeliveryStatus,
    pub due_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
}

/// Tally of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub swept_at: DateTime<Utc>,
    pub due_items: usize,
    pub learners: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// In learner id order
    pub results: Vec<DeliveryResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ItemKey;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_summary_breakdown_and_estimate() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let learner = Uuid::new_v4();
        let mut entries = Vec::new();
        for (i, d) in [Difficulty::Hard, Difficulty::Hard, Difficulty::Medium, Difficulty::Wait, Difficulty::Wait]
            .into_iter()
            .enumerate()
        {
            let mut entry = ScheduleEntry::unreviewed(learner, ItemKey::word(&format!("w{}", i)), t0);
            entry.difficulty = d;
            entry.next_review_at = t0 + Duration::hours(i as i64);
            entries.push(entry);
        }

        let summary = DueSummary::from_entries(learner, &entries, 30);
        assert_eq!(summary.due_count, 5);
        assert_eq!(summary.hard, 2);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.easy, 0);
        assert_eq!(summary.wait, 2);
        // 150s rounds up to 3 minutes
        assert_eq!(summary.estimated_minutes, 3);
        assert_eq!(summary.oldest_due_at, Some(t0));
        assert_eq!(summary.headline(), "5 reviews due (2 hard, 1 medium, 2 new) - about 3 min");
    }

    #[test]
    fn test_single_item_headline() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let learner = Uuid::new_v4();
        let entries = vec![ScheduleEntry::unreviewed(learner, ItemKey::word("lucid"), t0)];

        let summary = DueSummary::from_entries(learner, &entries, 30);
        assert_eq!(summary.estimated_minutes, 1);
        assert_eq!(summary.headline(), "1 review due (1 new) - about 1 min");
    }
}
