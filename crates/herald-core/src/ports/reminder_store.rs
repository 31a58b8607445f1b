//! ReminderStore port - the persistent source of truth for reminders.
//!
//! # Design
//! - Every status write is a compare-and-swap on the current status. This is
//!   the only concurrency mechanism: no lock is held across a tick.
//! - Every mutation bumps `Reminder::revision`. The delivery write pins the
//!   revision the engine selected, so an edit made while a send is in flight
//!   is never overwritten by `sent`.
//! - A reminder that vanished or moved on is reported as `false`, never as an
//!   error. `Err` is reserved for the store being unreachable
//!   (`HeraldError::StoreUnavailable`) and for inserting a duplicate id.
//! - User-facing calls are scoped by `(id, owner)`. The scan queries and
//!   `update_status` cross owners.
//! - The store stamps `updated_at` on every mutation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{OwnerId, Reminder, ReminderFields, ReminderId, ReminderStatus, Result};

/// Owner-scoped listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderQuery {
    pub status: Option<ReminderStatus>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    /// Only reminders scheduled at or after this instant.
    pub scheduled_from: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ReminderQuery {
    pub fn matches(&self, reminder: &Reminder) -> bool {
        self.status.is_none_or(|s| reminder.status == s)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| reminder.matches_search(needle))
            && self
                .scheduled_from
                .is_none_or(|from| reminder.scheduled_at >= from)
    }
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    // ---- scan engine (all owners) ----

    /// `status == upcoming AND scheduled_at <= now`.
    async fn find_due_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>>;

    /// `status == upcoming AND scheduled_at < threshold`.
    async fn find_stale_upcoming(&self, threshold: DateTime<Utc>) -> Result<Vec<Reminder>>;

    /// Set `new` only if the reminder exists and is still `expected`.
    async fn update_status(
        &self,
        id: ReminderId,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool>;

    /// [`update_status`](Self::update_status) that also requires the record
    /// to still be at `revision`, i.e. untouched since it was read.
    async fn update_status_at_revision(
        &self,
        id: ReminderId,
        revision: u64,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool>;

    /// Bulk [`update_status`](Self::update_status); the guard applies per
    /// record. Returns how many records changed.
    async fn update_status_many(
        &self,
        ids: &[ReminderId],
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<usize> {
        let mut changed = 0;
        for id in ids {
            if self.update_status(*id, expected, new).await? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    // ---- owner-scoped ----

    /// `PersistenceConflict` if the id is already taken.
    async fn insert(&self, reminder: Reminder) -> Result<()>;

    async fn get(&self, owner: OwnerId, id: ReminderId) -> Result<Option<Reminder>>;

    /// Matching reminders ordered by `scheduled_at` ascending.
    async fn list(&self, owner: OwnerId, query: &ReminderQuery) -> Result<Vec<Reminder>>;

    /// Replace editable fields if the reminder is still `expected`.
    /// Returns the updated record.
    async fn update_fields(
        &self,
        owner: OwnerId,
        id: ReminderId,
        expected: ReminderStatus,
        fields: ReminderFields,
    ) -> Result<Option<Reminder>>;

    /// Owner-scoped [`update_status`](Self::update_status).
    async fn update_status_scoped(
        &self,
        owner: OwnerId,
        id: ReminderId,
        expected: ReminderStatus,
        new: ReminderStatus,
    ) -> Result<bool>;

    /// Returns `false` when nothing was removed.
    async fn delete(&self, owner: OwnerId, id: ReminderId) -> Result<bool>;
}
