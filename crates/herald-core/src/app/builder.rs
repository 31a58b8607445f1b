//! SchedulerBuilder - wiring and startup validation.
//!
//! `build()` fails fast: a missing collaborator or an invalid configuration is
//! reported before any tick can run, so a misconfigured process never starts
//! its loop.

use std::sync::Arc;

use crate::app::config::SchedulerConfig;
use crate::app::scan::DueScanEngine;
use crate::app::scheduler::SchedulerLoop;
use crate::domain::HeraldError;
use crate::ports::{Clock, Notifier, ReminderStore, SystemClock};

/// # Example
/// ```ignore
/// let scheduler = SchedulerBuilder::new()
///     .store(store)
///     .notifier(notifier)
///     .config(config.scheduler)
///     .build()?;
/// let handle = scheduler.start();
/// ```
#[derive(Default)]
pub struct SchedulerBuilder {
    store: Option<Arc<dyn ReminderStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    config: SchedulerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing component: {0}. Call SchedulerBuilder::{0}() before build().")]
    MissingComponent(&'static str),

    #[error(transparent)]
    InvalidConfig(#[from] HeraldError),
}

impl From<BuildError> for HeraldError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::InvalidConfig(inner) => inner,
            missing => HeraldError::Configuration(missing.to_string()),
        }
    }
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn ReminderStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<SchedulerLoop, BuildError> {
        self.config.validate()?;
        let store = self.store.ok_or(BuildError::MissingComponent("store"))?;
        let notifier = self
            .notifier
            .ok_or(BuildError::MissingComponent("notifier"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let engine = DueScanEngine::new(store, notifier, Arc::clone(&clock), &self.config);
        Ok(SchedulerLoop::new(engine, clock, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::{InMemoryReminderStore, OutboxNotifier};

    fn store() -> Arc<dyn ReminderStore> {
        Arc::new(InMemoryReminderStore::new(Arc::new(SystemClock)))
    }

    #[test]
    fn build_success() {
        let built = SchedulerBuilder::new()
            .store(store())
            .notifier(Arc::new(OutboxNotifier::new()))
            .build();
        assert!(built.is_ok());
    }

    #[test]
    fn build_missing_notifier() {
        let built = SchedulerBuilder::new().store(store()).build();
        assert!(matches!(built, Err(BuildError::MissingComponent("notifier"))));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = SchedulerConfig {
            notify_timeout_secs: 120,
            ..SchedulerConfig::default()
        };
        let err = SchedulerBuilder::new()
            .store(store())
            .notifier(Arc::new(OutboxNotifier::new()))
            .config(config)
            .build()
            .err()
            .unwrap();

        assert!(matches!(err, BuildError::InvalidConfig(_)));
        assert_eq!(HeraldError::from(err).kind(), ErrorKind::Configuration);
    }
}
