//! Activity log and streak data models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::ItemKind;

/// Kind of study action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    WordReviewed,
    MinuteStudied,
    QuestionAnswered,
    LessonCompleted,
}

impl ActivityKind {
    /// Event kind emitted when an item of `kind` is reviewed
    pub fn for_review(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Word => ActivityKind::WordReviewed,
            ItemKind::Lesson => ActivityKind::LessonCompleted,
        }
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "word-reviewed" => Ok(Self::WordReviewed),
            "minute-studied" => Ok(Self::MinuteStudied),
            "question-answered" => Ok(Self::QuestionAnswered),
            "lesson-completed" => Ok(Self::LessonCompleted),
            other => Err(format!("unknown activity kind: {}", other)),
        }
    }
}

/// Append-only fact: one per learner action, never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub learner_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub quantity: u32,
}

impl ActivityEvent {
    pub fn new(learner_id: Uuid, timestamp: DateTime<Utc>, kind: ActivityKind, quantity: u32) -> Self {
        Self {
            learner_id,
            timestamp,
            kind,
            quantity,
        }
    }

    /// Single-unit event
    pub fn once(learner_id: Uuid, timestamp: DateTime<Utc>, kind: ActivityKind) -> Self {
        Self::new(learner_id, timestamp, kind, 1)
    }
}

/// Streak state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "days", rename_all = "camelCase")]
pub enum StreakState {
    NoStreak,
    /// Consecutive qualifying days ending today or yesterday
    ActiveStreak(u32),
}

/// Streak badge data, derived from the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakStatus {
    pub state: StreakState,
    pub current_streak: u32,
    /// Longest run ever observed, including the current one
    pub longest_streak: u32,
    /// Today already qualifies
    pub is_active: bool,
    /// Streak is alive but today does not qualify yet
    pub needs_activity: bool,
    pub last_active_day: Option<NaiveDate>,
}

impl StreakStatus {
    pub fn empty() -> Self {
        Self {
            state: StreakState::NoStreak,
            current_streak: 0,
            longest_streak: 0,
            is_active: false,
            needs_activity: false,
            last_active_day: None,
        }
    }
}

/// Progress toward one daily goal metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalMetric {
    pub done: u32,
    pub goal: u32,
    /// Clamped to [0, 100]
    pub percent: f64,
}

/// Daily goal ring data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub words_reviewed: GoalMetric,
    pub minutes_studied: GoalMetric,
    pub questions_answered: GoalMetric,
    /// Rounded mean of the three metric percentages
    pub overall_percent: u32,
    pub is_complete: bool,
}

/// One day of the activity calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub event_count: u32,
    pub words_reviewed: u32,
    pub minutes_studied: u32,
    pub questions_answered: u32,
    pub lessons_completed: u32,
}

impl CalendarDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            event_count: 0,
            words_reviewed: 0,
            minutes_studied: 0,
            questions_answered: 0,
            lessons_completed: 0,
        }
    }

    pub fn qualifies(&self) -> bool {
        self.event_count > 0
    }
}

/// Streak and goals computed from a single read of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub streak: StreakStatus,
    pub progress: DailyProgress,
}
