//! Status - running totals published by the scheduler loop.
//!
//! Readers get a snapshot through `SchedulerHandle::status()`; the loop is the
//! only writer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::TickReport;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub ticks_run: u64,
    /// Ticks that returned an error (store down, notifier misconfigured).
    pub ticks_failed: u64,
    /// Interval firings dropped because the previous tick was still running.
    pub ticks_skipped: u64,
    pub notified_total: u64,
    pub failed_total: u64,
    pub missed_total: u64,
    pub conflicts_total: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_report: Option<TickReport>,
    pub last_error: Option<String>,
}

impl SchedulerStatus {
    pub(crate) fn record_success(&mut self, at: DateTime<Utc>, report: TickReport) {
        self.ticks_run += 1;
        self.notified_total += report.notified as u64;
        self.failed_total += report.failed as u64;
        self.missed_total += report.missed as u64;
        self.conflicts_total += report.conflicts as u64;
        self.last_tick_at = Some(at);
        self.last_report = Some(report);
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, at: DateTime<Utc>, error: String) {
        self.ticks_run += 1;
        self.ticks_failed += 1;
        self.last_tick_at = Some(at);
        self.last_error = Some(error);
    }
}
