use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::models::SweepReport;
use super::sweep::NotificationSweep;
use crate::clock::Clock;

/// Messages to control the sweep scheduler
#[derive(Debug)]
pub enum SweepSchedulerMessage {
    /// Sweep immediately, outside the regular interval
    RunNow,
    Shutdown,
}

/// Handle for the periodic sweep task
pub struct SweepScheduler {
    sender: mpsc::Sender<SweepSchedulerMessage>,
    reports: watch::Receiver<Option<SweepReport>>,
    handle: JoinHandle<()>,
}

impl SweepScheduler {
    pub fn run_now(&self) {
        let _ = self.sender.try_send(SweepSchedulerMessage::RunNow);
    }

    /// Latest completed sweep, updated after every run
    pub fn reports(&self) -> watch::Receiver<Option<SweepReport>> {
        self.reports.clone()
    }

    /// Stop the loop and wait for it to exit. A sweep in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.sender.send(SweepSchedulerMessage::Shutdown).await;
        if let Err(e) = self.handle.await {
            log::error!("Sweep scheduler task ended abnormally: {}", e);
        }
    }
}

/// Start the periodic sweep.
///
/// Spawns a loop that sweeps once at startup and then every `interval`,
/// taking `now` from `clock` for each run.
pub fn start_sweep_scheduler(
    sweep: Arc<NotificationSweep>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> SweepScheduler {
    let (tx, rx) = mpsc::channel(8);
    let (report_tx, report_rx) = watch::channel(None);

    let handle = tokio::spawn(async move {
        sweep_scheduler_loop(sweep, clock, interval, rx, report_tx).await;
    });

    SweepScheduler {
        sender: tx,
        reports: report_rx,
        handle,
    }
}

async fn run_sweep(
    sweep: &NotificationSweep,
    clock: &dyn Clock,
    reports: &watch::Sender<Option<SweepReport>>,
) {
    match sweep.run(clock.now()).await {
        Ok(report) => {
            let _ = reports.send(Some(report));
        }
        Err(e) => log::error!("Sweep scheduler: sweep failed: {}", e),
    }
}

async fn sweep_scheduler_loop(
    sweep: Arc<NotificationSweep>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    mut receiver: mpsc::Receiver<SweepSchedulerMessage>,
    reports: watch::Sender<Option<SweepReport>>,
) {
    log::info!("Sweep scheduler started, every {}s", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_sweep(&sweep, clock.as_ref(), &reports).await;
            }

            msg = receiver.recv() => {
                match msg {
                    Some(SweepSchedulerMessage::RunNow) => {
                        log::info!("Sweep scheduler: immediate sweep requested");
                        run_sweep(&sweep, clock.as_ref(), &reports).await;
                    }
                    Some(SweepSchedulerMessage::Shutdown) | None => {
                        log::info!("Sweep scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::SweepConfig;
    use crate::notify::LogDelivery;
    use crate::storage::{ItemKey, ItemStore, MemoryItemStore, ScheduleEntry};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweeps_on_start_and_on_demand() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let store = Arc::new(MemoryItemStore::new());
        let sweep = Arc::new(NotificationSweep::new(store.clone(), Arc::new(LogDelivery), SweepConfig::default()));
        let clock = Arc::new(FixedClock::new(t0));

        let scheduler = start_sweep_scheduler(sweep, clock.clone(), Duration::from_secs(3600));
        let mut reports = scheduler.reports();

        reports.changed().await.unwrap();
        assert_eq!(reports.borrow().as_ref().map(|r| r.due_items), Some(0));

        store
            .upsert(&ScheduleEntry::unreviewed(Uuid::new_v4(), ItemKey::word("lucid"), t0), None)
            .await
            .unwrap();
        clock.advance(chrono::Duration::minutes(1));
        scheduler.run_now();

        reports.changed().await.unwrap();
        let report = reports.borrow().clone().unwrap();
        assert_eq!(report.due_items, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.swept_at, t0 + chrono::Duration::minutes(1));

        scheduler.shutdown().await;
    }
}
