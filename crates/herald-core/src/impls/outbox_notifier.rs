//! In-memory notifier that records what it delivered.
//!
//! Outcomes can be scripted: queue specific results with [`OutboxNotifier::push_outcome`]
//! or make every send fail with [`OutboxNotifier::fail_all`]. Unscripted sends
//! are delivered.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::Notification;
use crate::ports::{Delivery, Notifier, NotifierError};

/// Scripted result for one upcoming send.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Deliver,
    Fail(String),
    Misconfigured(String),
}

#[derive(Default)]
pub struct OutboxNotifier {
    delivered: Mutex<Vec<Notification>>,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    fail_all: AtomicBool,
    attempts: AtomicUsize,
}

impl OutboxNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, outcome: ScriptedOutcome) {
        lock(&self.script).push_back(outcome);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Every call to `send`, delivered or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Notification> {
        lock(&self.delivered).clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let scripted = lock(&self.script).pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None if self.fail_all.load(Ordering::SeqCst) => {
                ScriptedOutcome::Fail("outbox set to fail".to_string())
            }
            None => ScriptedOutcome::Deliver,
        };

        match outcome {
            ScriptedOutcome::Deliver => {
                lock(&self.delivered).push(notification.clone());
                Ok(Delivery::Delivered)
            }
            ScriptedOutcome::Fail(reason) => Ok(Delivery::Failed(reason)),
            ScriptedOutcome::Misconfigured(reason) => Err(NotifierError::Misconfigured(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReminderId;
    use ulid::Ulid;

    fn notification() -> Notification {
        Notification {
            reminder_id: ReminderId::from_ulid(Ulid::new()),
            recipient: "ana@example.com".into(),
            subject: "Reminder: x".into(),
            body_text: String::new(),
            body_html: String::new(),
        }
    }

    #[tokio::test]
    async fn script_runs_before_default() {
        let outbox = OutboxNotifier::new();
        outbox.push_outcome(ScriptedOutcome::Fail("451 try later".into()));

        let first = outbox.send(&notification()).await.unwrap();
        let second = outbox.send(&notification()).await.unwrap();

        assert_eq!(first, Delivery::Failed("451 try later".into()));
        assert!(second.is_delivered());
        assert_eq!(outbox.attempts(), 2);
        assert_eq!(outbox.delivered().len(), 1);
    }

    #[tokio::test]
    async fn fail_all_and_misconfiguration() {
        let outbox = OutboxNotifier::new();
        outbox.fail_all(true);
        assert!(!outbox.send(&notification()).await.unwrap().is_delivered());

        outbox.push_outcome(ScriptedOutcome::Misconfigured("no api key".into()));
        assert!(outbox.send(&notification()).await.is_err());
        assert!(outbox.delivered().is_empty());
    }
}
