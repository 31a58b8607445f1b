//! Domain model: identifiers, the reminder record, its status machine,
//! notification content and errors.

pub mod errors;
pub mod ids;
pub mod notification;
pub mod reminder;
pub mod report;
pub mod status;

pub use errors::{ErrorKind, HeraldError, Result};
pub use ids::{OwnerId, ReminderId};
pub use notification::Notification;
pub use reminder::{Reminder, ReminderDraft, ReminderFields, RepeatCadence};
pub use report::TickReport;
pub use status::{ReminderStatus, StatusEvent};
