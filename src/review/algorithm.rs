//! Interval policy
//!
//! Maps a self-reported difficulty rating to the delay before the item is
//! due again. The mapping is a fixed table (overridable via `[intervals]`
//! in the config file):
//!
//! | rating     | delay           |
//! |------------|-----------------|
//! | 3 = Hard   | 4 hours         |
//! | 2 = Medium | 1 day           |
//! | 1 = Easy   | 3 days          |
//! | 0 = Wait   | 0 (due now)     |

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::IntervalConfig;
use crate::error::{Result, SchedulerError};

/// Learner's self-assessed recall difficulty.
///
/// Ordering follows the rating value, so `Hard > Medium > Easy > Wait`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Difficulty {
    /// Not yet studied, or deferred
    #[default]
    Wait = 0,
    /// Known well
    Easy = 1,
    /// Getting there
    Medium = 2,
    /// Needs more practice
    Hard = 3,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Hard,
        Difficulty::Medium,
        Difficulty::Easy,
        Difficulty::Wait,
    ];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Wait => "wait",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Difficulty::Wait),
            1 => Ok(Difficulty::Easy),
            2 => Ok(Difficulty::Medium),
            3 => Ok(Difficulty::Hard),
            other => Err(SchedulerError::InvalidDifficulty(other.to_string())),
        }
    }
}

impl From<Difficulty> for i64 {
    fn from(value: Difficulty) -> Self {
        value.as_i64()
    }
}

impl std::str::FromStr for Difficulty {
    type Err = SchedulerError;

    /// Accepts the numeric rating or its label ("hard", "medium", ...)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Difficulty::try_from(n);
        }
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchedulerError::InvalidDifficulty(s.to_string()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Difficulty → delay table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    hard: Duration,
    medium: Duration,
    easy: Duration,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            hard: Duration::hours(4),
            medium: Duration::days(1),
            easy: Duration::days(3),
        }
    }
}

impl IntervalPolicy {
    /// Build a policy from the `[intervals]` config section.
    ///
    /// The table must keep `hard < medium < easy`, otherwise harder items
    /// would come back later than easier ones.
    pub fn from_config(config: &IntervalConfig) -> Result<Self> {
        let policy = Self {
            hard: Duration::minutes(config.hard_minutes as i64),
            medium: Duration::minutes(config.medium_minutes as i64),
            easy: Duration::minutes(config.easy_minutes as i64),
        };

        if !(Duration::zero() < policy.hard && policy.hard < policy.medium && policy.medium < policy.easy) {
            return Err(SchedulerError::Config(format!(
                "interval table must satisfy 0 < hard < medium < easy (got {} / {} / {})",
                format_delay(policy.hard),
                format_delay(policy.medium),
                format_delay(policy.easy)
            )));
        }

        Ok(policy)
    }

    /// Delay until the next review for a rating. Pure: same input, same output.
    pub fn next_delay(&self, difficulty: Difficulty) -> Duration {
        match difficulty {
            Difficulty::Hard => self.hard,
            Difficulty::Medium => self.medium,
            Difficulty::Easy => self.easy,
            Difficulty::Wait => Duration::zero(),
        }
    }

    /// When an item rated `difficulty` at `reviewed_at` becomes due
    pub fn next_review_at(&self, difficulty: Difficulty, reviewed_at: DateTime<Utc>) -> DateTime<Utc> {
        reviewed_at + self.next_delay(difficulty)
    }

    /// Due time each rating would produce, hardest first.
    /// Used to show the learner what each button does.
    pub fn preview(&self, now: DateTime<Utc>) -> [(Difficulty, DateTime<Utc>); 4] {
        Difficulty::ALL.map(|d| (d, self.next_review_at(d, now)))
    }
}

/// Delay for a raw rating under the stock table.
///
/// Out-of-range ratings are a caller bug and are reported, never coerced.
pub fn next_delay(rating: i64) -> Result<Duration> {
    let difficulty = Difficulty::try_from(rating)?;
    Ok(IntervalPolicy::default().next_delay(difficulty))
}

/// Format a delay to a short human-readable string
pub fn format_delay(delay: Duration) -> String {
    let minutes = delay.num_minutes();
    if minutes <= 0 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes < 24 * 60 {
        format!("{}h", delay.num_hours())
    } else if delay.num_days() < 7 {
        format!("{}d", delay.num_days())
    } else if delay.num_days() < 30 {
        format!("{}w", delay.num_weeks())
    } else {
        format!("{}mo", delay.num_days() / 30)
    }
}
