//! Study activity and streaks
//!
//! Events are appended once and never changed. Streaks, daily goal progress
//! and the calendar are derived from them on demand.

pub mod models;
pub mod streak;
pub mod tracker;

pub use models::*;
pub use streak::{activity_calendar, daily_progress, derive_streak};
pub use tracker::ActivityTracker;
