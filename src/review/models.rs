use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Review statistics for one learner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_items: usize,
    pub due_items: usize,
    pub hard_items: usize,
    pub medium_items: usize,
    pub easy_items: usize,
    pub waiting_items: usize,
    /// Entries that exist but have never been reviewed
    pub never_reviewed: usize,
    pub reviewed_today: usize,
    pub total_reviews: u64,
    /// Share of recorded recalls that succeeded, across all items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recall_rate: Option<f64>,
}

/// Items becoming due on one calendar day.
/// The first day also carries everything already overdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub due_count: usize,
}
