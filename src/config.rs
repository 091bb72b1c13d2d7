//! Configuration file (`config.toml`)
//!
//! Every field carries a serde default, so a missing or empty file yields
//! the stock interval table (4h / 1d / 3d), the default daily goals and a
//! 15-minute sweep.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub intervals: IntervalConfig,
    pub goals: GoalConfig,
    pub sweep: SweepConfig,
    pub calendar: CalendarConfig,
    pub storage: StorageConfig,
}

/// Review delay per difficulty, in minutes. `Wait` is always immediate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntervalConfig {
    pub hard_minutes: u32,
    pub medium_minutes: u32,
    pub easy_minutes: u32,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            hard_minutes: 4 * 60,
            medium_minutes: 24 * 60,
            easy_minutes: 3 * 24 * 60,
        }
    }
}

/// Daily targets for the goal ring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoalConfig {
    pub words_reviewed: u32,
    pub minutes_studied: u32,
    pub questions_answered: u32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            words_reviewed: 20,
            minutes_studied: 30,
            questions_answered: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between periodic sweeps
    pub interval_secs: u64,
    /// Hard limit on a single learner's delivery call
    pub learner_timeout_secs: u64,
    pub max_concurrent_deliveries: usize,
    /// Used for the "about N minutes" estimate
    pub seconds_per_item: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            learner_timeout_secs: 10,
            max_concurrent_deliveries: 8,
            seconds_per_item: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalendarConfig {
    /// Offset of the learner-local day boundary from UTC
    pub utc_offset_minutes: i32,
}

impl CalendarConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                SchedulerError::Config(format!(
                    "calendar.utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("ssat-review").join("config.toml"))
            .ok_or_else(|| SchedulerError::Config("no configuration directory".to_string()))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Resolve the data directory: explicit setting, else the platform default
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|p| p.join("ssat-review"))
            .ok_or_else(|| SchedulerError::Config("no data directory".to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let i = &self.intervals;
        if i.hard_minutes == 0 {
            return Err(SchedulerError::Config(
                "intervals.hard_minutes must be greater than 0".to_string(),
            ));
        }
        if !(i.hard_minutes < i.medium_minutes && i.medium_minutes < i.easy_minutes) {
            return Err(SchedulerError::Config(format!(
                "intervals must satisfy hard < medium < easy (got {} / {} / {})",
                i.hard_minutes, i.medium_minutes, i.easy_minutes
            )));
        }

        let s = &self.sweep;
        if s.interval_secs == 0 {
            return Err(SchedulerError::Config("sweep.interval_secs must be greater than 0".to_string()));
        }
        if s.learner_timeout_secs == 0 {
            return Err(SchedulerError::Config(
                "sweep.learner_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if s.max_concurrent_deliveries == 0 {
            return Err(SchedulerError::Config(
                "sweep.max_concurrent_deliveries must be greater than 0".to_string(),
            ));
        }
        if s.seconds_per_item == 0 {
            return Err(SchedulerError::Config("sweep.seconds_per_item must be greater than 0".to_string()));
        }

        self.calendar.offset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.intervals.hard_minutes, 240);
        assert_eq!(config.intervals.medium_minutes, 1440);
        assert_eq!(config.intervals.easy_minutes, 4320);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [intervals]
            hard_minutes = 60

            [goals]
            words_reviewed = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.intervals.hard_minutes, 60);
        assert_eq!(config.intervals.medium_minutes, 1440);
        assert_eq!(config.goals.words_reviewed, 5);
        assert_eq!(config.goals.minutes_studied, 30);
    }

    #[test]
    fn test_rejects_unordered_intervals() {
        let mut config = Config::default();
        config.intervals.medium_minutes = 10_000;
        assert!(matches!(config.validate(), Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_offset_and_timeout() {
        let mut config = Config::default();
        config.calendar.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sweep.learner_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        let calendar = CalendarConfig {
            utc_offset_minutes: i32::MAX / 60 + 1,
        };
        assert!(matches!(calendar.offset(), Err(SchedulerError::Config(_))));

        // Wraps to a valid-looking offset if multiplied unchecked
        let calendar = CalendarConfig {
            utc_offset_minutes: 71_582_789,
        };
        assert!(calendar.offset().is_err());

        let calendar = CalendarConfig {
            utc_offset_minutes: -300,
        };
        assert_eq!(calendar.offset().unwrap().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[sweep]\ninterval_secs = 0\n").unwrap();
        assert!(Config::load(&path).is_err());

        fs::write(&path, "[sweep\n").unwrap();
        assert!(matches!(Config::load(&path), Err(SchedulerError::Toml(_))));
    }
}
