use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid difficulty rating: {0} (expected 0-3)")]
    InvalidDifficulty(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid item key: {0}")]
    InvalidItem(String),

    #[error("Invalid activity event: {0}")]
    InvalidEvent(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SchedulerError {
    /// Whether the caller may retry the same operation later.
    ///
    /// Validation failures (`InvalidDifficulty`, `InvalidTimestamp`) and
    /// missing learners never become valid by retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedulerError::StoreUnavailable(_) | SchedulerError::Conflict(_) | SchedulerError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SchedulerError::StoreUnavailable("db down".into()).is_transient());
        assert!(SchedulerError::Conflict("lucid".into()).is_transient());
        assert!(!SchedulerError::InvalidDifficulty("7".into()).is_transient());
        assert!(!SchedulerError::NotFound("learner".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidDifficulty("9".into());
        assert_eq!(err.to_string(), "Invalid difficulty rating: 9 (expected 0-3)");
    }
}
