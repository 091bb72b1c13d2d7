//! Due-item sweep across all learners.
//!
//! Reads schedule state only. Each learner's delivery runs under its own
//! timeout, so one stuck channel call cannot hold up the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use uuid::Uuid;

use super::delivery::Delivery;
use super::models::{DeliveryResult, DeliveryStatus, DueSummary, SweepReport};
use crate::config::SweepConfig;
use crate::error::Result;
use crate::storage::{ItemStore, ScheduleEntry};

pub struct NotificationSweep {
    store: Arc<dyn ItemStore>,
    delivery: Arc<dyn Delivery>,
    config: SweepConfig,
}

/// Group due entries into one summary per learner, in learner id order
pub fn summarize_due(entries: &[ScheduleEntry], seconds_per_item: u32) -> Vec<DueSummary> {
    let mut by_learner: BTreeMap<Uuid, Vec<ScheduleEntry>> = BTreeMap::new();
    for entry in entries {
        by_learner.entry(entry.learner_id).or_default().push(entry.clone());
    }

    by_learner
        .into_iter()
        .map(|(learner_id, items)| DueSummary::from_entries(learner_id, &items, seconds_per_item))
        .collect()
}

impl NotificationSweep {
    pub fn new(store: Arc<dyn ItemStore>, delivery: Arc<dyn Delivery>, config: SweepConfig) -> Self {
        Self {
            store,
            delivery,
            config,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run one sweep.
    ///
    /// Fails only if the due query fails. Delivery failures and timeouts are
    /// counted in the report.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let due = self.store.query_due(None, now).await?;
        let summaries = summarize_due(&due, self.config.seconds_per_item);
        let timeout = Duration::from_secs(self.config.learner_timeout_secs);

        let mut results: Vec<DeliveryResult> = stream::iter(summaries)
            .map(|summary| self.deliver(summary, timeout))
            .buffer_unordered(self.config.max_concurrent_deliveries.max(1))
            .collect()
            .await;
        results.sort_by_key(|r| r.learner_id);

        let count = |status: DeliveryStatus| results.iter().filter(|r| r.status == status).count();
        let report = SweepReport {
            swept_at: now,
            due_items: due.len(),
            learners: results.len(),
            delivered: count(DeliveryStatus::Delivered),
            skipped: count(DeliveryStatus::Skipped),
            failed: count(DeliveryStatus::Failed),
            timed_out: count(DeliveryStatus::TimedOut),
            results,
        };

        log::info!(
            "Sweep at {}: {} due item(s) for {} learner(s); delivered={}, skipped={}, failed={}, timed_out={}",
            now,
            report.due_items,
            report.learners,
            report.delivered,
            report.skipped,
            report.failed,
            report.timed_out
        );
        Ok(report)
    }

    async fn deliver(&self, summary: DueSummary, timeout: Duration) -> DeliveryResult {
        let channel = self.delivery.channel_name().to_string();
        let start = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.delivery.send(summary.learner_id, &summary)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (status, reason) = match outcome {
            Ok(Ok(outcome)) if outcome.delivered => (DeliveryStatus::Delivered, None),
            Ok(Ok(outcome)) => (DeliveryStatus::Skipped, outcome.reason),
            Ok(Err(e)) => {
                log::warn!(
                    "Delivery to learner {} via {} failed: {}",
                    summary.learner_id,
                    channel,
                    e
                );
                (DeliveryStatus::Failed, Some(e.to_string()))
            }
            Err(_) => {
                log::warn!(
                    "Delivery to learner {} via {} timed out after {}s",
                    summary.learner_id,
                    channel,
                    timeout.as_secs()
                );
                (
                    DeliveryStatus::TimedOut,
                    Some(format!("no response within {}s", timeout.as_secs())),
                )
            }
        };

        DeliveryResult {
            learner_id: summary.learner_id,
            channel,
            status,
            due_count: summary.due_count,
            reason,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use crate::notify::delivery::DeliveryError;
    use crate::notify::models::DeliveryOutcome;
    use crate::review::Difficulty;
    use crate::storage::{ItemKey, MemoryItemStore};
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Counts sends; fails for some learners and stalls for others
    #[derive(Default)]
    struct MockDelivery {
        send_count: AtomicUsize,
        fail_for: HashSet<Uuid>,
        stall_for: HashSet<Uuid>,
        seen: Mutex<Vec<DueSummary>>,
    }

    #[async_trait::async_trait]
    impl Delivery for MockDelivery {
        async fn send(&self, learner_id: Uuid, summary: &DueSummary) -> std::result::Result<DeliveryOutcome, DeliveryError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(summary.clone());
            }
            if self.stall_for.contains(&learner_id) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail_for.contains(&learner_id) {
                return Err(DeliveryError::Transport("mock failure".to_string()));
            }
            Ok(DeliveryOutcome::delivered())
        }

        fn channel_name(&self) -> &str {
            "mock"
        }
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl ItemStore for DownStore {
        async fn ensure_learner(&self, _learner_id: Uuid) -> Result<()> {
            Ok(())
        }

        async fn get(&self, _learner_id: Uuid, _item: &ItemKey) -> Result<Option<ScheduleEntry>> {
            Ok(None)
        }

        async fn upsert(&self, entry: &ScheduleEntry, _expected: Option<u64>) -> Result<ScheduleEntry> {
            Ok(entry.clone())
        }

        async fn delete(&self, _learner_id: Uuid, _item: &ItemKey) -> Result<bool> {
            Ok(false)
        }

        async fn list(&self, _learner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
            Ok(Vec::new())
        }

        async fn query_due(&self, _learner_id: Option<Uuid>, _now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
            Err(SchedulerError::StoreUnavailable("connection refused".into()))
        }
    }

    async fn seed(store: &MemoryItemStore, learner: Uuid, words: &[&str], difficulty: Difficulty) {
        for word in words {
            let mut entry = ScheduleEntry::unreviewed(learner, ItemKey::word(word), t0());
            entry.difficulty = difficulty;
            store.upsert(&entry, None).await.unwrap();
        }
    }

    fn sweep_config() -> SweepConfig {
        SweepConfig {
            learner_timeout_secs: 1,
            ..SweepConfig::default()
        }
    }

    #[tokio::test]
    async fn test_groups_by_learner() {
        let store = Arc::new(MemoryItemStore::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        seed(&store, a, &["lucid", "terse"], Difficulty::Hard).await;
        seed(&store, b, &["aloof"], Difficulty::Wait).await;

        let delivery = Arc::new(MockDelivery::default());
        let sweep = NotificationSweep::new(store, delivery.clone(), sweep_config());

        let report = sweep.run(t0()).await.unwrap();
        assert_eq!(report.due_items, 3);
        assert_eq!(report.learners, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(delivery.send_count.load(Ordering::SeqCst), 2);

        let summary_a = report.results.iter().find(|r| r.learner_id == a).unwrap();
        assert_eq!(summary_a.due_count, 2);
        assert!(report.results.windows(2).all(|w| w[0].learner_id < w[1].learner_id));

        let seen = delivery.seen.lock().unwrap();
        let for_a = seen.iter().find(|s| s.learner_id == a).unwrap();
        assert_eq!(for_a.hard, 2);
        assert_eq!(for_a.estimated_minutes, 1);
    }

    #[tokio::test]
    async fn test_nothing_due() {
        let store = Arc::new(MemoryItemStore::new());
        let delivery = Arc::new(MockDelivery::default());
        let sweep = NotificationSweep::new(store, delivery.clone(), sweep_config());

        let report = sweep.run(t0()).await.unwrap();
        assert_eq!(report.learners, 0);
        assert_eq!(delivery.send_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_others() {
        let store = Arc::new(MemoryItemStore::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        seed(&store, a, &["lucid"], Difficulty::Medium).await;
        seed(&store, b, &["terse"], Difficulty::Medium).await;

        let delivery = Arc::new(MockDelivery {
            fail_for: HashSet::from([a]),
            ..Default::default()
        });
        let sweep = NotificationSweep::new(store.clone(), delivery, sweep_config());

        let report = sweep.run(t0()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);

        // Schedule state is untouched by delivery results
        assert_eq!(store.query_due(None, t0()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_slow_channel_times_out() {
        let store = Arc::new(MemoryItemStore::new());
        let slow = Uuid::new_v4();
        let fast = Uuid::new_v4();
        seed(&store, slow, &["lucid"], Difficulty::Hard).await;
        seed(&store, fast, &["terse"], Difficulty::Hard).await;

        let delivery = Arc::new(MockDelivery {
            stall_for: HashSet::from([slow]),
            ..Default::default()
        });
        let sweep = NotificationSweep::new(store, delivery, sweep_config());

        let report = sweep.run(t0()).await.unwrap();
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.delivered, 1);

        let stalled = report.results.iter().find(|r| r.learner_id == slow).unwrap();
        assert_eq!(stalled.status, DeliveryStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_repeated_sweeps_renotify() {
        let store = Arc::new(MemoryItemStore::new());
        seed(&store, Uuid::new_v4(), &["lucid"], Difficulty::Easy).await;

        let delivery = Arc::new(MockDelivery::default());
        let sweep = NotificationSweep::new(store, delivery.clone(), sweep_config());

        let first = sweep.run(t0()).await.unwrap();
        let second = sweep.run(t0()).await.unwrap();
        assert_eq!(first.due_items, second.due_items);
        assert_eq!(delivery.send_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_failure_aborts() {
        let delivery = Arc::new(MockDelivery::default());
        let sweep = NotificationSweep::new(Arc::new(DownStore), delivery.clone(), sweep_config());

        let err = sweep.run(t0()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::StoreUnavailable(_)));
        assert_eq!(delivery.send_count.load(Ordering::SeqCst), 0);
    }
}
