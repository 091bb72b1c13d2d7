//! In-process backends, used by tests and embedders that persist elsewhere

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{due_order, ItemKey, ScheduleEntry};
use super::store::{check_revision, ActivityLog, ItemStore};
use crate::activity::ActivityEvent;
use crate::error::{Result, SchedulerError};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| SchedulerError::StoreUnavailable(format!("lock poisoned: {}", e)))
}

fn check_learner(learners: &Option<HashSet<Uuid>>, learner_id: Uuid) -> Result<()> {
    match learners {
        Some(known) if !known.contains(&learner_id) => {
            Err(SchedulerError::NotFound(format!("Learner {} not found", learner_id)))
        }
        _ => Ok(()),
    }
}

/// Schedule entries held in a map, one lock for the whole store
#[derive(Default)]
pub struct MemoryItemStore {
    entries: Mutex<HashMap<Uuid, BTreeMap<ItemKey, ScheduleEntry>>>,
    learners: Option<HashSet<Uuid>>,
}

impl MemoryItemStore {
    /// Store that accepts any learner
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects learners outside `learners` with `NotFound`
    pub fn with_learners(learners: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            learners: Some(learners.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl ItemStore for MemoryItemStore {
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()> {
        check_learner(&self.learners, learner_id)
    }

    async fn get(&self, learner_id: Uuid, item: &ItemKey) -> Result<Option<ScheduleEntry>> {
        let entries = lock(&self.entries)?;
        Ok(entries.get(&learner_id).and_then(|items| items.get(item)).cloned())
    }

    async fn upsert(&self, entry: &ScheduleEntry, expected_revision: Option<u64>) -> Result<ScheduleEntry> {
        check_learner(&self.learners, entry.learner_id)?;

        let mut entries = lock(&self.entries)?;
        let items = entries.entry(entry.learner_id).or_default();
        let revision = check_revision(items.get(&entry.item), expected_revision, &entry.item)?;

        let mut stored = entry.clone();
        stored.revision = revision;
        items.insert(stored.item.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, learner_id: Uuid, item: &ItemKey) -> Result<bool> {
        let mut entries = lock(&self.entries)?;
        Ok(entries
            .get_mut(&learner_id)
            .map(|items| items.remove(item).is_some())
            .unwrap_or(false))
    }

    async fn list(&self, learner_id: Uuid) -> Result<Vec<ScheduleEntry>> {
        let entries = lock(&self.entries)?;
        Ok(entries
            .get(&learner_id)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn query_due(&self, learner_id: Option<Uuid>, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
        let entries = lock(&self.entries)?;
        let mut due: Vec<ScheduleEntry> = entries
            .iter()
            .filter(|(id, _)| learner_id.map_or(true, |wanted| **id == wanted))
            .flat_map(|(_, items)| items.values())
            .filter(|e| e.is_due(now))
            .cloned()
            .collect();

        due.sort_by(due_order);
        Ok(due)
    }
}

/// Activity events held in per-learner vectors
#[derive(Default)]
pub struct MemoryActivityLog {
    events: Mutex<HashMap<Uuid, Vec<ActivityEvent>>>,
    learners: Option<HashSet<Uuid>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learners(learners: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            learners: Some(learners.into_iter().collect()),
        }
    }
}

#[async_trait::async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn ensure_learner(&self, learner_id: Uuid) -> Result<()> {
        check_learner(&self.learners, learner_id)
    }

    async fn append(&self, event: &ActivityEvent) -> Result<()> {
        check_learner(&self.learners, event.learner_id)?;
        let mut events = lock(&self.events)?;
        events.entry(event.learner_id).or_default().push(event.clone());
        Ok(())
    }

    async fn events(&self, learner_id: Uuid) -> Result<Vec<ActivityEvent>> {
        let events = lock(&self.events)?;
        let mut list = events.get(&learner_id).cloned().unwrap_or_default();
        list.sort_by_key(|e| e.timestamp);
        Ok(list)
    }
}
