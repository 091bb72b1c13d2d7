//! Due-review notifications
//!
//! A sweep finds everything due across all learners, builds one summary per
//! learner and hands it to a [`Delivery`] channel. The sweep never writes
//! schedule state.

pub mod delivery;
pub mod models;
pub mod scheduler;
pub mod sweep;

pub use delivery::{Delivery, DeliveryError, LogDelivery};
pub use models::*;
pub use scheduler::{start_sweep_scheduler, SweepScheduler, SweepSchedulerMessage};
pub use sweep::{summarize_due, NotificationSweep};
