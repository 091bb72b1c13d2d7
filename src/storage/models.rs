use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::review::Difficulty;

/// What kind of learning item a schedule entry tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Vocabulary word, keyed by its text
    Word,
    /// Lesson topic, keyed by its path
    Lesson,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Word => "word",
            ItemKind::Lesson => "lesson",
        }
    }
}

/// Stable identifier of a learning item, unique per learner.
///
/// Textual form is `word:<text>` or `lesson:<path>`. Word text is
/// lowercased so "Lucid" and "lucid" share one schedule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKey {
    pub kind: ItemKind,
    pub id: String,
}

impl ItemKey {
    pub fn word(text: &str) -> Self {
        Self {
            kind: ItemKind::Word,
            id: text.trim().to_lowercase(),
        }
    }

    pub fn lesson(path: &str) -> Self {
        Self {
            kind: ItemKind::Lesson,
            id: path.trim().to_string(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for ItemKey {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| SchedulerError::InvalidItem(format!("missing kind prefix in {:?}", s)))?;

        let key = match kind.trim() {
            "word" => ItemKey::word(id),
            "lesson" => ItemKey::lesson(id),
            other => {
                return Err(SchedulerError::InvalidItem(format!("unknown item kind {:?}", other)));
            }
        };

        if key.id.is_empty() {
            return Err(SchedulerError::InvalidItem(format!("empty item id in {:?}", s)));
        }
        Ok(key)
    }
}

impl TryFrom<String> for ItemKey {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemKey> for String {
    fn from(value: ItemKey) -> Self {
        value.to_string()
    }
}

/// One recorded recall outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallOutcome {
    pub at: DateTime<Utc>,
    pub recalled: bool,
}

/// Schedule state for one (learner, item) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub learner_id: Uuid,
    pub item: ItemKey,
    /// Last self-reported rating
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Due at or after this instant
    pub next_review_at: DateTime<Utc>,
    /// Append-only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recall_history: Vec<RecallOutcome>,
    pub created_at: DateTime<Utc>,
    /// Compare-and-swap token, bumped by the store on every write
    #[serde(default)]
    pub revision: u64,
}

impl ScheduleEntry {
    /// First-exposure state: never reviewed, due immediately
    pub fn unreviewed(learner_id: Uuid, item: ItemKey, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            item,
            difficulty: Difficulty::Wait,
            review_count: 0,
            last_reviewed_at: None,
            next_review_at: now,
            recall_history: Vec::new(),
            created_at: now,
            revision: 0,
        }
    }

    /// Check if the entry is due at `now` (boundary inclusive)
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }

    /// Fraction of recorded recalls that succeeded, if any were recorded
    pub fn recall_rate(&self) -> Option<f64> {
        if self.recall_history.is_empty() {
            return None;
        }
        let recalled = self.recall_history.iter().filter(|r| r.recalled).count();
        Some(recalled as f64 / self.recall_history.len() as f64)
    }
}

/// Due-list order: hardest first, then longest overdue.
/// Learner and item break remaining ties so the order is total.
pub fn due_order(a: &ScheduleEntry, b: &ScheduleEntry) -> Ordering {
    b.difficulty
        .cmp(&a.difficulty)
        .then_with(|| a.next_review_at.cmp(&b.next_review_at))
        .then_with(|| a.learner_id.cmp(&b.learner_id))
        .then_with(|| a.item.cmp(&b.item))
}
