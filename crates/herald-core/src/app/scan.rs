//! DueScanEngine - one tick of scan and dispatch.
//!
//! # Flow
//! 1. `find_due_upcoming(now)`; a store error abandons the whole tick
//! 2. notify each due reminder, at most `notify_concurrency` at a time
//! 3. on delivery, CAS `upcoming -> sent` pinned to the revision selected in 1
//! 4. sweep: `find_stale_upcoming(now - grace)` and bulk CAS `upcoming -> missed`
//!
//! The sweep runs after the notify pass, so a stale reminder still gets its
//! attempt in the same tick and, if that succeeds, is no longer `upcoming`
//! when the sweep looks at it.
//!
//! Failures are isolated per reminder: a failed send or status write is
//! counted and logged, and the rest of the batch carries on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::config::SchedulerConfig;
use crate::domain::status::{self, StatusEvent};
use crate::domain::{HeraldError, Notification, Reminder, ReminderStatus, Result, TickReport};
use crate::ports::{Clock, Delivery, Notifier, NotifierError, ReminderStore};

/// Result of one reminder's notify attempt.
#[derive(Debug)]
enum ItemOutcome {
    Sent,
    Failed,
    Conflict,
    Fatal(NotifierError),
    Skipped,
}

pub struct DueScanEngine {
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    grace_period: chrono::Duration,
    notify_concurrency: usize,
    notify_timeout: Duration,
}

impl DueScanEngine {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            grace_period: config.grace_period(),
            notify_concurrency: config.notify_concurrency.max(1),
            notify_timeout: config.notify_timeout(),
        }
    }

    pub fn grace_period(&self) -> chrono::Duration {
        self.grace_period
    }

    /// Run both passes against the clock's current time.
    pub async fn run_tick(&self) -> Result<TickReport> {
        let now = self.clock.now();
        let report = self.run_tick_at(now).await?;

        if report.is_idle() {
            debug!(%now, "tick complete, nothing due");
        } else {
            info!(
                %now,
                scanned = report.scanned,
                notified = report.notified,
                failed = report.failed,
                missed = report.missed,
                conflicts = report.conflicts,
                "tick complete"
            );
        }
        Ok(report)
    }

    pub async fn run_tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut report = self.notify_due(now).await?;
        report.missed = self.sweep_missed(now).await?;
        Ok(report)
    }

    /// Notify pass. `Err` only for an unreachable store or a misconfigured
    /// notifier; per-reminder problems land in the report.
    pub async fn notify_due(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let due = self.store.find_due_upcoming(now).await?;
        let mut report = TickReport {
            scanned: due.len(),
            ..TickReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }
        debug!(count = due.len(), "dispatching due reminders");

        let semaphore = Arc::new(Semaphore::new(self.notify_concurrency));
        let halted = Arc::new(AtomicBool::new(false));
        let mut sends = JoinSet::new();

        for reminder in due {
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let semaphore = Arc::clone(&semaphore);
            let halted = Arc::clone(&halted);
            let timeout = self.notify_timeout;

            sends.spawn(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ItemOutcome::Skipped;
                };
                if halted.load(Ordering::SeqCst) {
                    return ItemOutcome::Skipped;
                }
                let outcome = dispatch_one(store, notifier, reminder, timeout).await;
                if matches!(outcome, ItemOutcome::Fatal(_)) {
                    halted.store(true, Ordering::SeqCst);
                }
                outcome
            });
        }

        let mut fatal = None;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(ItemOutcome::Sent) => report.notified += 1,
                Ok(ItemOutcome::Failed) => report.failed += 1,
                Ok(ItemOutcome::Conflict) => report.conflicts += 1,
                Ok(ItemOutcome::Skipped) => {}
                Ok(ItemOutcome::Fatal(err)) => {
                    report.failed += 1;
                    fatal.get_or_insert(err);
                }
                Err(join_err) => {
                    report.failed += 1;
                    error!(error = %join_err, "notify task panicked");
                }
            }
        }

        if let Some(err) = fatal {
            error!(error = %err, "notifier misconfigured, abandoning tick");
            return Err(err.into());
        }
        Ok(report)
    }

    /// Missed sweep. Returns how many reminders moved to `missed`.
    ///
    /// Running it again for the same `now` changes nothing.
    pub async fn sweep_missed(&self, now: DateTime<Utc>) -> Result<usize> {
        let threshold = status::missed_threshold(now, self.grace_period);
        let stale = self.store.find_stale_upcoming(threshold).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        let target = ReminderStatus::Upcoming.apply(StatusEvent::GraceElapsed)?;
        let ids: Vec<_> = stale.iter().map(|r| r.id).collect();
        let changed = self
            .store
            .update_status_many(&ids, ReminderStatus::Upcoming, target)
            .await?;

        if changed > 0 {
            info!(count = changed, "marked reminders as missed");
        }
        if changed < ids.len() {
            debug!(
                skipped = ids.len() - changed,
                "stale reminders changed before the sweep reached them"
            );
        }
        Ok(changed)
    }
}

async fn dispatch_one(
    store: Arc<dyn ReminderStore>,
    notifier: Arc<dyn Notifier>,
    reminder: Reminder,
    timeout: Duration,
) -> ItemOutcome {
    let notification = Notification::for_reminder(&reminder);

    let delivery = match tokio::time::timeout(timeout, notifier.send(&notification)).await {
        Ok(Ok(delivery)) => delivery,
        Ok(Err(err)) => return ItemOutcome::Fatal(err),
        Err(_) => Delivery::Failed(format!("no response within {timeout:?}")),
    };

    let event = match &delivery {
        Delivery::Delivered => StatusEvent::Delivered,
        Delivery::Failed(_) => StatusEvent::DeliveryFailed,
    };
    let target = match reminder.status.apply(event) {
        Ok(target) => target,
        Err(err) => {
            warn!(reminder_id = %reminder.id, error = %err, "skipping reminder");
            return ItemOutcome::Conflict;
        }
    };

    if let Delivery::Failed(reason) = delivery {
        let err = HeraldError::TransientDelivery {
            id: reminder.id,
            reason,
        };
        warn!(reminder_id = %reminder.id, error = %err, "will retry next tick");
        return ItemOutcome::Failed;
    }

    match store
        .update_status_at_revision(reminder.id, reminder.revision, reminder.status, target)
        .await
    {
        Ok(true) => {
            debug!(reminder_id = %reminder.id, title = %reminder.title, "reminder sent");
            ItemOutcome::Sent
        }
        Ok(false) => {
            debug!(
                reminder_id = %reminder.id,
                "reminder changed or deleted while sending, leaving it alone"
            );
            ItemOutcome::Conflict
        }
        Err(err) => {
            error!(reminder_id = %reminder.id, error = %err, "failed to record delivery");
            ItemOutcome::Failed
        }
    }
}
