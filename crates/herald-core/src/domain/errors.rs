//! Errors and their operational classification.

use thiserror::Error;

use super::ids::ReminderId;
use super::status::{ReminderStatus, StatusEvent};

/// ErrorKind groups errors by how an operator should react to them.
///
/// - Transient: retried on the next tick, nothing to do.
/// - Conflict: a conditional update lost a race; benign.
/// - Infrastructure: the store is unreachable; the tick is abandoned.
/// - Configuration: fatal at startup.
/// - Validation: rejected input from a user-facing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Conflict,
    Infrastructure,
    Configuration,
    Validation,
}

#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("delivery of {id} failed: {reason}")]
    TransientDelivery { id: ReminderId, reason: String },

    #[error("{id} no longer matches the expected state")]
    PersistenceConflict { id: ReminderId },

    #[error("reminder store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("illegal transition from {from} on {event:?}")]
    InvalidTransition {
        from: ReminderStatus,
        event: StatusEvent,
    },

    #[error("{0} not found")]
    NotFound(ReminderId),
}

impl HeraldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeraldError::TransientDelivery { .. } => ErrorKind::Transient,
            HeraldError::PersistenceConflict { .. } | HeraldError::InvalidTransition { .. } => {
                ErrorKind::Conflict
            }
            HeraldError::StoreUnavailable(_) => ErrorKind::Infrastructure,
            HeraldError::Configuration(_) => ErrorKind::Configuration,
            HeraldError::Validation { .. } | HeraldError::NotFound(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        HeraldError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T, E = HeraldError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let id = ReminderId::from_ulid(Ulid::new());

        assert_eq!(
            HeraldError::TransientDelivery {
                id,
                reason: "smtp 451".into()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            HeraldError::PersistenceConflict { id }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            HeraldError::StoreUnavailable("connection refused".into()).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            HeraldError::Configuration("bad sender".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn messages_name_the_subject() {
        let err = HeraldError::validation("title", "must not be empty");
        assert_eq!(err.to_string(), "invalid title: must not be empty");

        let err = HeraldError::InvalidTransition {
            from: ReminderStatus::Sent,
            event: StatusEvent::GraceElapsed,
        };
        assert_eq!(err.to_string(), "illegal transition from sent on GraceElapsed");
    }
}
