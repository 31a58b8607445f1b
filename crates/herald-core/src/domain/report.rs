use serde::{Deserialize, Serialize};

/// Counters for one tick of the scan engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Due reminders selected for a notify attempt.
    pub scanned: usize,
    /// Delivered and moved to `sent`.
    pub notified: usize,
    /// Delivery failed, timed out, or the status write errored.
    pub failed: usize,
    /// Reclassified `upcoming -> missed` by the sweep.
    pub missed: usize,
    /// Conditional updates that found the reminder changed or deleted.
    pub conflicts: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == TickReport::default()
    }
}
