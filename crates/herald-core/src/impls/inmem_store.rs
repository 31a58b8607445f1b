//! In-memory reminder store.
//!
//! # Design
//! - One `tokio::sync::Mutex` guards the whole map, so every compare-and-swap
//!   is atomic. The lock is never held across anything but map access.
//! - `insert` never replaces an existing id.
//!
//! # Test hooks
//! - `set_available(false)` makes every call fail with `StoreUnavailable`
//! - `peek` reads a record regardless of owner

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    HeraldError, OwnerId, Reminder, ReminderFields, ReminderId, ReminderStatus, Result,
};
use crate::ports::{Clock, ReminderQuery, ReminderStore};

pub struct InMemoryReminderStore {
    records: Mutex<HashMap<ReminderId, Reminder>>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
}

impl InMemoryReminderStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the backing store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Snapshot of one record regardless of owner.
    pub async fn peek(&self, id: ReminderId) -> Option<Reminder> {
        self.records.lock().await.get(&id).cloned()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HeraldError::StoreUnavailable(
                "in-memory store switched off".to_string(),
            ))
        }
    }

    fn sorted(mut reminders: Vec<Reminder>) -> Vec<Reminder> {
        reminders.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        reminders
    }

    async fn select_upcoming(&self, keep: impl Fn(DateTime<Utc>) -> bool) -> Result<Vec<Reminder>> {
        self.ensure_available()?;
        let records = self.records.lock().await;
        let found = records
            .values()
            .filter(|r| r.status == ReminderStatus::Upcoming && keep(r.scheduled_at))
            .cloned()
            .collect();
        Ok(Self::sorted(found))
    }

    fn swap_status(
        records: &mut HashMap<ReminderId, Reminder>,
        id: ReminderId,
        owner: Option<OwnerId>,
        revision: Option<u64>,
        expected: ReminderStatus,
        new: ReminderStatus,
        now: DateTime<Utc>,
    ) -> bool {
        match records.get_mut(&id) {
            Some(r)
                if r.status == expected
                    && owner.is_none_or(|o| r.is_owned_by(o))
                    && revision.is_none_or(|v| r.revision == v) =>
            {
                r.set_status(new, now);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn find_due_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.select_upcoming(|at| at <= now).await
    }

    async fn find_stale_upcoming(&self, threshold: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.select_upcoming(|at| at < threshold).await
    }

    async fn update_status(
        &self,
        id: ReminderId,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool> {
        self.ensure_available()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        Ok(Self::swap_status(&mut records, id, None, None, expected, new, now))
    }

    async fn update_status_at_revision(
        &self,
        id: ReminderId,
        revision: u64,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool> {
        self.ensure_available()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        Ok(Self::swap_status(
            &mut records,
            id,
            None,
            Some(revision),
            expected,
            new,
            now,
        ))
    }

    async fn update_status_many(
        &self,
        ids: &[ReminderId],
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<usize> {
        self.ensure_available()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        Ok(ids
            .iter()
            .filter(|id| Self::swap_status(&mut records, **id, None, None, expected, new, now))
            .count())
    }

    async fn insert(&self, reminder: Reminder) -> Result<()> {
        self.ensure_available()?;
        let mut records = self.records.lock().await;
        match records.entry(reminder.id) {
            Entry::Occupied(_) => Err(HeraldError::PersistenceConflict { id: reminder.id }),
            Entry::Vacant(slot) => {
                slot.insert(reminder);
                Ok(())
            }
        }
    }

    async fn get(&self, owner: OwnerId, id: ReminderId) -> Result<Option<Reminder>> {
        self.ensure_available()?;
        let records = self.records.lock().await;
        Ok(records.get(&id).filter(|r| r.is_owned_by(owner)).cloned())
    }

    async fn list(&self, owner: OwnerId, query: &ReminderQuery) -> Result<Vec<Reminder>> {
        self.ensure_available()?;
        let found = {
            let records = self.records.lock().await;
            records
                .values()
                .filter(|r| r.is_owned_by(owner) && query.matches(r))
                .cloned()
                .collect()
        };
        let mut sorted = Self::sorted(found);
        if let Some(limit) = query.limit {
            sorted.truncate(limit);
        }
        Ok(sorted)
    }

    async fn update_fields(
        &self,
        owner: OwnerId,
        id: ReminderId,
        expected: ReminderStatus,
        fields: ReminderFields,
    ) -> Result<Option<Reminder>> {
        self.ensure_available()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        match records.get_mut(&id) {
            Some(r) if r.is_owned_by(owner) && r.status == expected => {
                r.apply_fields(fields, now);
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status_scoped(
        &self,
        owner: OwnerId,
        id: ReminderId,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool> {
        self.ensure_available()?;
        let now = self.clock.now();
        let mut records = self.records.lock().await;
        Ok(Self::swap_status(&mut records, id, Some(owner), None, expected, new, now))
    }

    async fn delete(&self, owner: OwnerId, id: ReminderId) -> Result<bool> {
        self.ensure_available()?;
        let mut records = self.records.lock().await;
        if records.get(&id).is_some_and(|r| r.is_owned_by(owner)) {
            records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }
}
