use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{due_order, ItemKey, ScheduleEntry};
use super::oplog;
use super::store::{check_revision, ActivityLog, ItemStore};
use crate::activity::ActivityEvent;
use crate::error::{Result, SchedulerError};

/// JSON-file backend.
///
/// Layout under the base path:
/// ```text
/// learners/<uuid>/schedule.json    pretty JSON array of entries
/// learners/<uuid>/activity.jsonl   one event per line
/// ```
/// Writes go through one async lock, so a read-modify-write of
/// `schedule.json` is atomic within this process.
pub struct FileStorage {
    base_path: PathBuf,
    require_registered: bool,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            require_registered: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Only learners with an existing directory are accepted; others get
    /// `NotFound`. See [`register_learner`](Self::register_learner).
    pub fn require_registered_learners(mut self, require: bool) -> Self {
        self.require_registered = require;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.learners_dir()).map_err(unavailable)?;
        Ok(())
    }

    pub fn register_learner(&self, learner_id: Uuid) -> Result<()> {
        fs::create_dir_all(self.learner_dir(learner_id)).map_err(unavailable)?;
        Ok(())
    }

    /// Learner ids that have a directory, in id order
    pub fn list_learners(&self) -> Result<Vec<Uuid>> {
        let dir = self.learners_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut learners = Vec::new();
        for entry in fs::read_dir(&dir).map_err(unavailable)? {
            let entry = entry.map_err(unavailable)?;
            if let Some(id) = entry.file_name().to_str().and_then(|n| Uuid::parse_str(n).ok()) {
                learners.push(id);
            }
        }
        learners.sort();
        Ok(learners)
    }

    fn learners_dir(&self) -> PathBuf {
        self.base_path.join("learners")
    }

    fn learner_dir(&self, learner_id: Uuid) -> PathBuf {
        self.learners_dir().join(learner_id.to_string())
    }

    fn schedule_path(&self, learner_id: Uuid) -> PathBuf {
        self.learner_dir(learner_id).join("schedule.json")
    }

    fn check_learner(&self, learner_id: Uuid) -> Result<()> {
        if self.require_registered && !self.learner_dir(learner_id).is_dir() {
            return Err(SchedulerError::NotFound(format!("Learner {} not found", learner_id)));
        }
        Ok(())
    }

    fn load_schedule(&self, learner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        read_schedule(&self.schedule_path(learner_id))
    }

    fn save_schedule(&self, learner_id: Uuid, entries: &[ScheduleEntry]) -> Result<()> {
        let path = self.schedule_path(learner_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(unavailable)?;
        fs::rename(&tmp, &path).map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(e: std::io::Error) -> SchedulerError {
    SchedulerError::StoreUnavailable(e.to_string())
}

fn read_schedule(path: &Path) -> Result<Vec<ScheduleEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(unavailable)?;
    let mut entries: Vec<ScheduleEntry> = serde_json::from_str(&content)?;
    entries.sort_by(|a, b| a.item.cmp(&b.item));
    Ok(entries)
}

#[async_trait::async_trait]
impl ItemStore for FileStorage {
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()> {
        self.check_learner(learner_id)
    }

    async fn get(&self, learner_id: Uuid, item: &ItemKey) -> Result<Option<ScheduleEntry>> {
        let entries = self.load_schedule(learner_id)?;
        Ok(entries.into_iter().find(|e| &e.item == item))
    }

    async fn upsert(&self, entry: &ScheduleEntry, expected_revision: Option<u64>) -> Result<ScheduleEntry> {
        self.check_learner(entry.learner_id)?;
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load_schedule(entry.learner_id)?;
        let position = entries.iter().position(|e| e.item == entry.item);
        let revision = check_revision(position.map(|i| &entries[i]), expected_revision, &entry.item)?;

        let mut stored = entry.clone();
        stored.revision = revision;
        match position {
            Some(i) => entries[i] = stored.clone(),
            None => entries.push(stored.clone()),
        }
        entries.sort_by(|a, b| a.item.cmp(&b.item));

        self.save_schedule(entry.learner_id, &entries)?;
        log::debug!("Saved {} for learner {} at revision {}", stored.item, stored.learner_id, revision);
        Ok(stored)
    }

    async fn delete(&self, learner_id: Uuid, item: &ItemKey) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load_schedule(learner_id)?;
        let before = entries.len();
        entries.retain(|e| &e.item != item);
        if entries.len() == before {
            return Ok(false);
        }

        self.save_schedule(learner_id, &entries)?;
        Ok(true)
    }

    async fn list(&self, learner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        self.load_schedule(learner_id)
    }

    async fn query_due(&self, learner_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
        let learners = match learner_id {
            Some(id) => vec![id],
            None => self.list_learners()?,
        };

        let mut due = Vec::new();
        for id in learners {
            due.extend(self.load_schedule(id)?.into_iter().filter(|e| e.is_due(now)));
        }
        due.sort_by(due_order);
        Ok(due)
    }
}

#[async_trait::async_trait]
impl ActivityLog for FileStorage {
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()> {
        self.check_learner(learner_id)
    }

    async fn append(&self, event: &ActivityEvent) -> Result<()> {
        self.check_learner(event.learner_id)?;
        let _guard = self.write_lock.lock().await;

        let path = oplog::activity_log_path(&self.learner_dir(event.learner_id));
        oplog::append_event(&path, event).map_err(unavailable)
    }

    async fn events(&self, learner_id: Uuid) -> Result<Vec<ActivityEvent>> {
        let path = oplog::activity_log_path(&self.learner_dir(learner_id));
        let mut events = oplog::read_events(&path, learner_id).map_err(unavailable)?;
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;
    use crate::review::Difficulty;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().to_path_buf());
        storage.init().unwrap();
        (storage, temp_dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_reload() {
        let (storage, temp_dir) = create_test_storage();
        let learner = Uuid::new_v4();

        let entry = ScheduleEntry::unreviewed(learner, ItemKey::word("lucid"), t0());
        let stored = storage.upsert(&entry, None).await.unwrap();
        assert_eq!(stored.revision, 1);

        // A fresh handle over the same directory sees the write
        let reopened = FileStorage::new(temp_dir.path().to_path_buf());
        let loaded = reopened.get(learner, &ItemKey::word("lucid")).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert!(temp_dir
            .path()
            .join("learners")
            .join(learner.to_string())
            .join("schedule.json")
            .exists());
    }

    #[tokio::test]
    async fn test_upsert_conflict() {
        let (storage, _temp_dir) = create_test_storage();
        let learner = Uuid::new_v4();
        let entry = ScheduleEntry::unreviewed(learner, ItemKey::word("lucid"), t0());

        let stored = storage.upsert(&entry, None).await.unwrap();
        storage.upsert(&stored, Some(1)).await.unwrap();

        let err = storage.upsert(&stored, Some(1)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Conflict(_)));
        assert_eq!(storage.list(learner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_global_query_due() {
        let (storage, _temp_dir) = create_test_storage();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut hard = ScheduleEntry::unreviewed(a, ItemKey::word("terse"), t0());
        hard.difficulty = Difficulty::Hard;
        storage.upsert(&hard, None).await.unwrap();
        storage
            .upsert(&ScheduleEntry::unreviewed(b, ItemKey::lesson("/math/ratios"), t0()), None)
            .await
            .unwrap();
        let mut later = ScheduleEntry::unreviewed(b, ItemKey::word("aloof"), t0());
        later.next_review_at = t0() + Duration::days(1);
        storage.upsert(&later, None).await.unwrap();

        let due = storage.query_due(None, t0()).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].item, ItemKey::word("terse"));
        assert_eq!(storage.query_due(Some(b), t0()).await.unwrap().len(), 1);
        assert_eq!(storage.list_learners().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let (storage, _temp_dir) = create_test_storage();
        let learner = Uuid::new_v4();
        let key = ItemKey::word("lucid");
        storage
            .upsert(&ScheduleEntry::unreviewed(learner, key.clone(), t0()), None)
            .await
            .unwrap();

        assert!(storage.delete(learner, &key).await.unwrap());
        assert!(!storage.delete(learner, &key).await.unwrap());
        assert!(storage.list(learner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registered_learners_only() {
        let (storage, _temp_dir) = create_test_storage();
        let storage = storage.require_registered_learners(true);
        let known = Uuid::new_v4();
        storage.register_learner(known).unwrap();

        assert!(ItemStore::ensure_learner(&storage, known).await.is_ok());
        let err = ItemStore::ensure_learner(&storage, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_activity_log() {
        let (storage, _temp_dir) = create_test_storage();
        let learner = Uuid::new_v4();

        storage
            .append(&ActivityEvent::once(learner, t0() + Duration::hours(2), ActivityKind::WordReviewed))
            .await
            .unwrap();
        storage
            .append(&ActivityEvent::new(learner, t0(), ActivityKind::MinuteStudied, 20))
            .await
            .unwrap();

        let events = storage.events(learner).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ActivityKind::MinuteStudied);
    }
}
