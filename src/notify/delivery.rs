//! Delivery channel trait and the built-in log channel.
//!
//! Push and email transports live outside this crate; they plug in by
//! implementing [`Delivery`]. Retrying and rate limiting are the channel's
//! business.

use uuid::Uuid;

use super::models::{DeliveryOutcome, DueSummary};

/// Errors a delivery channel can report
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Recipient rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, learner_id: Uuid, summary: &DueSummary) -> Result<DeliveryOutcome, DeliveryError>;

    /// Human-readable name for this channel (e.g. "push", "email")
    fn channel_name(&self) -> &str;
}

/// Writes each summary to the log at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDelivery;

#[async_trait::async_trait]
impl Delivery for LogDelivery {
    async fn send(&self, learner_id: Uuid, summary: &DueSummary) -> Result<DeliveryOutcome, DeliveryError> {
        log::info!("[{}] learner {}: {}", self.channel_name(), learner_id, summary.headline());
        Ok(DeliveryOutcome::delivered())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
