//! Spaced-repetition review scheduling for SSAT practice.
//!
//! Learners rate how hard each vocabulary word or lesson felt; the
//! [`review::Scheduler`] turns that rating into the next due time. Study
//! events feed streaks and daily goals in [`activity`], and
//! [`notify::NotificationSweep`] tells learners when reviews are waiting.

pub mod activity;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod review;
pub mod storage;

pub use error::{Result, SchedulerError};
