//! App - the application layer.
//!
//! Combines the ports into the running service.
//!
//! # Components
//! - **HeraldConfig**: settings loaded once at startup
//! - **SchedulerBuilder**: wiring with fail-fast validation
//! - **DueScanEngine**: one tick of due notification plus missed sweep
//! - **SchedulerLoop**: fixed-cadence driver with graceful stop
//! - **ReminderService**: owner-scoped create/list/edit/complete/delete

pub mod builder;
pub mod config;
pub mod reminders;
pub mod scan;
pub mod scheduler;
pub mod status;

pub use self::builder::{BuildError, SchedulerBuilder};
pub use self::config::{HeraldConfig, NotifierSettings, SchedulerConfig};
pub use self::reminders::{ReminderFilter, ReminderService};
pub use self::scan::DueScanEngine;
pub use self::scheduler::{SchedulerHandle, SchedulerLoop, ShutdownOutcome};
pub use self::status::SchedulerStatus;
