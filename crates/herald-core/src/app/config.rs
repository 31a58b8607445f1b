//! Configuration loaded once at startup.
//!
//! ```toml
//! [scheduler]
//! tick_interval_secs = 60
//! grace_period_secs = 60
//! notify_concurrency = 8
//! notify_timeout_secs = 30
//! shutdown_timeout_secs = 30
//!
//! [notifier]
//! from = "Herald <reminders@example.com>"
//! ```
//!
//! Every field has a default, and a missing file means all defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::HeraldError;
use crate::domain::reminder::is_email_shaped;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeraldConfig {
    pub scheduler: SchedulerConfig,
    pub notifier: NotifierSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
    pub grace_period_secs: u64,
    /// Sends in flight at once within one tick.
    pub notify_concurrency: usize,
    /// Upper bound for a single send. Must be shorter than the tick interval.
    pub notify_timeout_secs: u64,
    /// How long `stop()` waits for an in-flight tick.
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            grace_period_secs: 60,
            notify_concurrency: 8,
            notify_timeout_secs: 30,
            shutdown_timeout_secs: 30,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_period_secs as i64)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), HeraldError> {
        if self.tick_interval_secs == 0 {
            return Err(config_error("scheduler.tick_interval_secs must be > 0"));
        }
        if self.notify_concurrency == 0 {
            return Err(config_error("scheduler.notify_concurrency must be >= 1"));
        }
        if self.notify_timeout_secs == 0 {
            return Err(config_error("scheduler.notify_timeout_secs must be > 0"));
        }
        if self.notify_timeout_secs >= self.tick_interval_secs {
            return Err(config_error(format!(
                "scheduler.notify_timeout_secs ({}) must be shorter than tick_interval_secs ({})",
                self.notify_timeout_secs, self.tick_interval_secs
            )));
        }
        if self.grace_period_secs == 0 {
            return Err(config_error("scheduler.grace_period_secs must be > 0"));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(config_error("scheduler.shutdown_timeout_secs must be > 0"));
        }
        if self.grace_period_secs > i64::MAX as u64 / 1000 {
            return Err(config_error("scheduler.grace_period_secs is out of range"));
        }
        Ok(())
    }
}

/// Sender identity for outgoing notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifierSettings {
    /// `addr@host` or `Display Name <addr@host>`.
    pub from: String,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            from: "Herald <reminders@herald.local>".to_string(),
        }
    }
}

impl NotifierSettings {
    /// The bare address part of `from`.
    pub fn address(&self) -> &str {
        let from = self.from.trim();
        match (from.rfind('<'), from.ends_with('>')) {
            (Some(open), true) => from[open + 1..from.len() - 1].trim(),
            _ => from,
        }
    }

    pub fn validate(&self) -> Result<(), HeraldError> {
        if !is_email_shaped(self.address()) {
            return Err(config_error(format!(
                "notifier.from '{}' is not a valid sender address",
                self.from
            )));
        }
        Ok(())
    }
}

impl HeraldConfig {
    pub fn validate(&self) -> Result<(), HeraldError> {
        self.scheduler.validate()?;
        self.notifier.validate()
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, HeraldError> {
        let config: HeraldConfig = toml::from_str(text)
            .map_err(|e| config_error(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`; a missing file yields the (validated) defaults.
    pub fn load(path: &Path) -> Result<Self, HeraldError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map_err(|e| match e {
                HeraldError::Configuration(msg) => {
                    config_error(format!("{}: {msg}", path.display()))
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = HeraldConfig::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(config_error(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))),
        }
    }
}

fn config_error(message: impl Into<String>) -> HeraldError {
    HeraldError::Configuration(message.into())
}
