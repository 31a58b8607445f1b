//! Impls - in-process implementations of the ports.
//!
//! - **InMemoryReminderStore**: development/test store with real CAS semantics
//! - **LogNotifier**: logs notifications instead of sending them
//! - **OutboxNotifier**: records deliveries, scriptable failures

pub mod inmem_store;
pub mod log_notifier;
pub mod outbox_notifier;

pub use self::inmem_store::InMemoryReminderStore;
pub use self::log_notifier::LogNotifier;
pub use self::outbox_notifier::{OutboxNotifier, ScriptedOutcome};
