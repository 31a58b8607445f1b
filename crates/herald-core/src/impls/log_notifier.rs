//! Notifier that writes each notification to the log instead of sending it.
//!
//! Default transport of the `herald` binary, so the scheduler can run without
//! mail credentials.

use async_trait::async_trait;
use tracing::info;

use crate::app::config::NotifierSettings;
use crate::domain::{HeraldError, Notification};
use crate::ports::{Delivery, Notifier, NotifierError};

#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    /// Fails with `Configuration` when the sender address is not usable.
    pub fn from_settings(settings: &NotifierSettings) -> Result<Self, HeraldError> {
        settings.validate()?;
        Ok(Self {
            from: settings.from.trim().to_string(),
        })
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<Delivery, NotifierError> {
        info!(
            reminder_id = %notification.reminder_id,
            from = %self.from,
            to = %notification.recipient,
            subject = %notification.subject,
            "reminder notification"
        );
        Ok(Delivery::Delivered)
    }
}
