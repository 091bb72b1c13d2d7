use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};

use ssat_review_lib::activity::ActivityTracker;
use ssat_review_lib::clock::{Clock, SystemClock};
use ssat_review_lib::config::Config;
use ssat_review_lib::notify::{LogDelivery, NotificationSweep};
use ssat_review_lib::review::{IntervalPolicy, Scheduler};
use ssat_review_lib::storage::FileStorage;

/// Shared application state for CLI commands
pub struct App {
    pub config: Config,
    pub storage: Arc<FileStorage>,
    pub scheduler: Scheduler,
    pub tracker: ActivityTracker,
    pub offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Load config and open the JSON store
    pub fn new(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => {
                let path = Config::default_path().context("Failed to locate config directory")?;
                Config::load_or_default(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            }
        };

        let data_dir = match data_dir {
            Some(dir) => dir,
            None => config.data_dir().context("Failed to get data directory")?,
        };

        let storage = FileStorage::new(data_dir);
        storage.init().context("Failed to initialize storage")?;
        let storage = Arc::new(storage);

        let policy = IntervalPolicy::from_config(&config.intervals).context("Invalid interval table")?;
        let offset = config.calendar.offset()?;

        let scheduler = Scheduler::new(storage.clone(), storage.clone(), policy).with_offset(offset);
        let tracker = ActivityTracker::new(storage.clone(), config.goals).with_offset(offset);

        log::debug!("Using data directory {}", storage.base_path().display());

        Ok(Self {
            config,
            storage,
            scheduler,
            tracker,
            offset,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Sweep over every learner in the store, reporting to the log channel
    pub fn sweep(&self) -> NotificationSweep {
        NotificationSweep::new(self.storage.clone(), Arc::new(LogDelivery), self.config.sweep.clone())
    }
}
