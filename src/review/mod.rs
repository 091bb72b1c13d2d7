//! Review scheduling
//!
//! - `Difficulty` ratings and the `IntervalPolicy` delay table
//! - `Scheduler`, the single writer of schedule state
//! - Per-learner statistics and due forecasts

pub mod algorithm;
pub mod models;
pub mod scheduler;

pub use algorithm::{format_delay, next_delay, Difficulty, IntervalPolicy};
pub use models::*;
pub use scheduler::Scheduler;
