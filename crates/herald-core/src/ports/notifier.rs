//! Notifier port - delivers a notification to its recipient.
//!
//! # Design
//! Ordinary transport problems (provider rejected, network down) are a
//! [`Delivery::Failed`], not an error: the reminder stays `upcoming` and is
//! retried on the next tick. `Err` means the notifier cannot work at all and
//! aborts the tick.
//!
//! Implementations must bound their own I/O; the engine additionally wraps
//! each call in `notify_timeout`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{HeraldError, Notification};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("notifier misconfigured: {0}")]
    Misconfigured(String),
}

impl From<NotifierError> for HeraldError {
    fn from(err: NotifierError) -> Self {
        HeraldError::Configuration(err.to_string())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifierError>;
}
