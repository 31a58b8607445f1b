//! Ports - the seams between the engine and the outside world.
//!
//! Each trait hides one external collaborator (persistent store, delivery
//! transport, wall clock, ID source) so the engine can be driven entirely by
//! in-memory implementations in tests.

pub mod clock;
pub mod id_generator;
pub mod notifier;
pub mod reminder_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::{Delivery, Notifier, NotifierError};
pub use self::reminder_store::{ReminderQuery, ReminderStore};
