//! Reminder status state machine.
//!
//! # Transitions
//! - Upcoming --(Delivered)--> Sent
//! - Upcoming --(DeliveryFailed)--> Upcoming (retried next tick)
//! - Upcoming --(GraceElapsed)--> Missed
//! - Upcoming | Sent | Missed --(Completed)--> Completed
//!
//! # Design
//! The scan engine only ever moves reminders out of `Upcoming`. `Completed` is
//! reachable from every other state, but only by a user action.
//!
//! This module is pure: it decides the next status, it never writes it. The
//! write is a conditional update on the store, guarded by the status the
//! decision was made from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::HeraldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    /// Created and waiting for its scheduled time (initial state).
    #[default]
    Upcoming,

    /// Notification delivered.
    Sent,

    /// Grace period elapsed without a successful delivery.
    Missed,

    /// Marked done by the owner.
    Completed,
}

/// Something that happened to a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The notifier accepted the notification.
    Delivered,

    /// The notifier failed or timed out.
    DeliveryFailed,

    /// The reminder stayed upcoming past its grace period.
    GraceElapsed,

    /// The owner marked the reminder done.
    Completed,
}

impl StatusEvent {
    /// Is this event raised by the scan engine (as opposed to a user action)?
    pub fn is_scan_event(self) -> bool {
        !matches!(self, StatusEvent::Completed)
    }
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Upcoming => "upcoming",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Missed => "missed",
            ReminderStatus::Completed => "completed",
        }
    }

    /// Terminal from the scan engine's point of view.
    pub fn is_terminal_for_scan(self) -> bool {
        !matches!(self, ReminderStatus::Upcoming)
    }

    /// Next status after `event`.
    ///
    /// Returns the current status when the event causes no change
    /// (`DeliveryFailed` on an upcoming reminder, `Completed` on a completed
    /// one). Any event the graph does not allow is `InvalidTransition`.
    pub fn apply(self, event: StatusEvent) -> Result<ReminderStatus, HeraldError> {
        use ReminderStatus::*;
        use StatusEvent as E;

        match (self, event) {
            (Upcoming, E::Delivered) => Ok(Sent),
            (Upcoming, E::DeliveryFailed) => Ok(Upcoming),
            (Upcoming, E::GraceElapsed) => Ok(Missed),
            (_, E::Completed) => Ok(Completed),
            (from, event) => Err(HeraldError::InvalidTransition { from, event }),
        }
    }

    /// Can `self` be replaced by `next` by some event?
    pub fn can_transition_to(self, next: ReminderStatus) -> bool {
        if self == next {
            return false;
        }
        [
            StatusEvent::Delivered,
            StatusEvent::DeliveryFailed,
            StatusEvent::GraceElapsed,
            StatusEvent::Completed,
        ]
        .into_iter()
        .any(|event| self.apply(event).is_ok_and(|to| to == next))
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(ReminderStatus::Upcoming),
            "sent" => Ok(ReminderStatus::Sent),
            "missed" => Ok(ReminderStatus::Missed),
            "completed" => Ok(ReminderStatus::Completed),
            other => Err(HeraldError::Validation {
                field: "status",
                message: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// Is a reminder scheduled at `scheduled_at` due at `now`?
pub fn is_due(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    scheduled_at <= now
}

/// Has the grace period run out for a reminder scheduled at `scheduled_at`?
///
/// Elapsed time equal to the grace period counts as overdue.
pub fn is_past_grace(scheduled_at: DateTime<Utc>, now: DateTime<Utc>, grace: Duration) -> bool {
    now - scheduled_at >= grace
}

/// Exclusive upper bound handed to the missed sweep.
///
/// Reminder timestamps carry millisecond precision, so
/// `scheduled_at < missed_threshold(now, grace)` holds exactly when
/// [`is_past_grace`] does.
pub fn missed_threshold(now: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    now - grace + Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    use ReminderStatus::*;

    #[rstest]
    #[case::delivered(Upcoming, StatusEvent::Delivered, Sent)]
    #[case::delivery_failed(Upcoming, StatusEvent::DeliveryFailed, Upcoming)]
    #[case::grace_elapsed(Upcoming, StatusEvent::GraceElapsed, Missed)]
    #[case::complete_upcoming(Upcoming, StatusEvent::Completed, Completed)]
    #[case::complete_sent(Sent, StatusEvent::Completed, Completed)]
    #[case::complete_missed(Missed, StatusEvent::Completed, Completed)]
    #[case::complete_completed(Completed, StatusEvent::Completed, Completed)]
    fn legal_transitions(
        #[case] from: ReminderStatus,
        #[case] event: StatusEvent,
        #[case] expected: ReminderStatus,
    ) {
        assert_eq!(from.apply(event).unwrap(), expected);
    }

    #[rstest]
    #[case::resend(Sent, StatusEvent::Delivered)]
    #[case::sent_then_missed(Sent, StatusEvent::GraceElapsed)]
    #[case::missed_then_sent(Missed, StatusEvent::Delivered)]
    #[case::missed_retry(Missed, StatusEvent::DeliveryFailed)]
    #[case::completed_sent(Completed, StatusEvent::Delivered)]
    #[case::completed_missed(Completed, StatusEvent::GraceElapsed)]
    fn scan_never_moves_terminal_states(#[case] from: ReminderStatus, #[case] event: StatusEvent) {
        assert!(event.is_scan_event());
        assert!(matches!(
            from.apply(event),
            Err(HeraldError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn nothing_leaves_completed() {
        for next in [Upcoming, Sent, Missed] {
            assert!(!Completed.can_transition_to(next));
        }
        assert!(Upcoming.can_transition_to(Sent));
        assert!(Missed.can_transition_to(Completed));
        assert!(!Sent.can_transition_to(Upcoming));
    }

    #[test]
    fn status_round_trips_through_its_name() {
        for status in [Upcoming, Sent, Missed, Completed] {
            assert_eq!(status.as_str().parse::<ReminderStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ReminderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let grace = Duration::seconds(60);

        assert!(is_due(t, t));
        assert!(!is_past_grace(t, t + Duration::seconds(59), grace));
        assert!(is_past_grace(t, t + Duration::seconds(60), grace));

        assert!(t >= missed_threshold(t + Duration::seconds(59), grace));
        assert!(t < missed_threshold(t + Duration::seconds(60), grace));
    }
}
