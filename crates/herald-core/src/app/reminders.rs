//! ReminderService - owner-scoped reminder operations.
//!
//! # Design
//! Every call takes the acting [`OwnerId`] explicitly; a reminder owned by
//! someone else behaves exactly like a missing one. Status writes go through
//! the store's conditional update, so user actions and the scan engine never
//! overwrite each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{
    HeraldError, OwnerId, Reminder, ReminderDraft, ReminderId, ReminderStatus, Result,
    StatusEvent,
};
use crate::ports::{Clock, IdGenerator, ReminderQuery, ReminderStore};

/// Reminders shown on the dashboard.
pub const DASHBOARD_LIMIT: usize = 5;

/// CAS attempts for `complete` before giving up with a conflict.
const COMPLETE_ATTEMPTS: usize = 4;

/// Listing filter as it arrives from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderFilter {
    pub status: Option<ReminderStatus>,
    pub search: Option<String>,
}

impl ReminderFilter {
    fn to_query(&self) -> ReminderQuery {
        ReminderQuery {
            status: self.status,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ..ReminderQuery::default()
        }
    }
}

pub struct ReminderService {
    store: Arc<dyn ReminderStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, ids, clock }
    }

    pub async fn create(&self, owner: OwnerId, draft: ReminderDraft) -> Result<Reminder> {
        let fields = draft.validate()?;
        let reminder = Reminder::new(self.ids.generate_reminder_id(), owner, fields, self.clock.now());
        self.store.insert(reminder.clone()).await?;
        info!(
            reminder_id = %reminder.id,
            owner_id = %owner,
            scheduled_at = %reminder.scheduled_at,
            "reminder created"
        );
        Ok(reminder)
    }

    pub async fn get(&self, owner: OwnerId, id: ReminderId) -> Result<Reminder> {
        self.store
            .get(owner, id)
            .await?
            .ok_or(HeraldError::NotFound(id))
    }

    /// Ordered by schedule, earliest first.
    pub async fn list(&self, owner: OwnerId, filter: &ReminderFilter) -> Result<Vec<Reminder>> {
        self.store.list(owner, &filter.to_query()).await
    }

    /// The next few reminders scheduled at or after now, any status.
    pub async fn dashboard(&self, owner: OwnerId) -> Result<Vec<Reminder>> {
        let query = ReminderQuery {
            scheduled_from: Some(self.clock.now()),
            limit: Some(DASHBOARD_LIMIT),
            ..ReminderQuery::default()
        };
        self.store.list(owner, &query).await
    }

    /// Replace the editable fields. Only an `upcoming` reminder can be edited.
    pub async fn edit(
        &self,
        owner: OwnerId,
        id: ReminderId,
        draft: ReminderDraft,
    ) -> Result<Reminder> {
        let fields = draft.validate()?;
        match self
            .store
            .update_fields(owner, id, ReminderStatus::Upcoming, fields)
            .await?
        {
            Some(updated) => {
                debug!(reminder_id = %id, "reminder edited");
                Ok(updated)
            }
            None => Err(self.explain_miss(owner, id).await?),
        }
    }

    /// Mark as completed from any other state.
    ///
    /// Returns `false` when it was already completed.
    pub async fn complete(&self, owner: OwnerId, id: ReminderId) -> Result<bool> {
        for _ in 0..COMPLETE_ATTEMPTS {
            let current = self.get(owner, id).await?;
            if current.status == ReminderStatus::Completed {
                return Ok(false);
            }
            let target = current.status.apply(StatusEvent::Completed)?;
            if self
                .store
                .update_status_scoped(owner, id, current.status, target)
                .await?
            {
                info!(reminder_id = %id, from = %current.status, "reminder completed");
                return Ok(true);
            }
            debug!(reminder_id = %id, "status moved during complete, retrying");
        }
        Err(HeraldError::PersistenceConflict { id })
    }

    pub async fn delete(&self, owner: OwnerId, id: ReminderId) -> Result<()> {
        if self.store.delete(owner, id).await? {
            info!(reminder_id = %id, "reminder deleted");
            Ok(())
        } else {
            Err(HeraldError::NotFound(id))
        }
    }

    /// Why a conditional write matched nothing.
    async fn explain_miss(&self, owner: OwnerId, id: ReminderId) -> Result<HeraldError> {
        Ok(match self.store.get(owner, id).await? {
            Some(_) => HeraldError::PersistenceConflict { id },
            None => HeraldError::NotFound(id),
        })
    }
}
