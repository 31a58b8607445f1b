//! SchedulerLoop - drives the scan engine on a fixed cadence.
//!
//! # Guarantees
//! - ticks never overlap: each tick runs inline in the loop task and interval
//!   firings that land during a long tick are dropped (`MissedTickBehavior::Skip`)
//! - a failed tick is logged and counted, the next tick runs as scheduled
//! - `stop()` stops new ticks at once and waits for the in-flight tick up to
//!   `shutdown_timeout`
//!
//! Dropping the handle without calling `stop()` also ends the loop after the
//! current tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::app::config::SchedulerConfig;
use crate::app::scan::DueScanEngine;
use crate::app::status::SchedulerStatus;
use crate::ports::Clock;

/// How `stop()` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop exited, including any in-flight tick.
    Graceful,
    /// The in-flight tick outlived the shutdown timeout and was left detached.
    Abandoned,
}

pub struct SchedulerLoop {
    engine: Arc<DueScanEngine>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    shutdown_timeout: Duration,
}

impl SchedulerLoop {
    pub fn new(engine: DueScanEngine, clock: Arc<dyn Clock>, config: &SchedulerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            clock,
            tick_interval: config.tick_interval(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    pub fn engine(&self) -> &DueScanEngine {
        &self.engine
    }

    /// Spawn the loop onto the current runtime. The first tick fires immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SchedulerStatus {
            running: true,
            ..SchedulerStatus::default()
        });
        let shutdown_timeout = self.shutdown_timeout;

        info!(
            tick_interval = ?self.tick_interval,
            grace_period_secs = self.engine.grace_period().num_seconds(),
            "scheduler starting"
        );
        let join = tokio::spawn(self.run(shutdown_rx, status_tx));

        SchedulerHandle {
            shutdown_tx,
            status_rx,
            join,
            shutdown_timeout,
        }
    }

    async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        status_tx: watch::Sender<SchedulerStatus>,
    ) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    // Err means the handle is gone; treat it like a shutdown request.
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let at = self.clock.now();

            match self.engine.run_tick().await {
                Ok(report) => status_tx.send_modify(|s| s.record_success(at, report)),
                Err(err) => {
                    error!(error = %err, kind = ?err.kind(), "tick failed");
                    status_tx.send_modify(|s| s.record_failure(at, err.to_string()));
                }
            }

            let skipped = skipped_firings(started.elapsed(), self.tick_interval);
            if skipped > 0 {
                warn!(
                    elapsed = ?started.elapsed(),
                    skipped,
                    "tick overran the interval, skipping missed firings"
                );
                status_tx.send_modify(|s| s.ticks_skipped += skipped);
            }
        }

        status_tx.send_modify(|s| s.running = false);
        info!("scheduler stopped");
    }
}

/// Interval firings that fell inside a tick of length `elapsed`.
fn skipped_firings(elapsed: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    (elapsed.as_nanos() / interval.as_nanos()) as u64
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<SchedulerStatus>,
    join: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl SchedulerHandle {
    pub fn status(&self) -> SchedulerStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver that keeps the last published status after the loop exits.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }

    /// Ask the loop to stop without waiting for it.
    pub fn request_shutdown(&self) {
        // receiver may already be gone if the loop exited
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop scheduling and wait for the in-flight tick, bounded by the
    /// configured shutdown timeout.
    pub async fn stop(mut self) -> ShutdownOutcome {
        self.request_shutdown();
        debug!(timeout = ?self.shutdown_timeout, "waiting for scheduler loop");

        match tokio::time::timeout(self.shutdown_timeout, &mut self.join).await {
            Ok(Ok(())) => ShutdownOutcome::Graceful,
            Ok(Err(join_err)) => {
                error!(error = %join_err, "scheduler loop ended abnormally");
                ShutdownOutcome::Graceful
            }
            Err(_) => {
                warn!(
                    timeout = ?self.shutdown_timeout,
                    "in-flight tick did not finish before shutdown timeout, abandoning it"
                );
                ShutdownOutcome::Abandoned
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Notification, OwnerId, Reminder, ReminderDraft, ReminderId};
    use crate::impls::{InMemoryReminderStore, OutboxNotifier};
    use crate::ports::{Delivery, FixedClock, Notifier, NotifierError, ReminderStore};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    /// Sleeps for `delay` per send; reports failure so the reminder stays due.
    struct Slow {
        delay: Duration,
        deliver: bool,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Slow {
        fn new(delay: Duration, deliver: bool) -> Self {
            Self {
                delay,
                deliver,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Notifier for Slow {
        async fn send(&self, _n: &Notification) -> Result<Delivery, NotifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.deliver {
                Ok(Delivery::Delivered)
            } else {
                Ok(Delivery::Failed("busy".into()))
            }
        }
    }

    struct Fixture {
        store: Arc<InMemoryReminderStore>,
        clock: FixedClock,
    }

    async fn fixture() -> Fixture {
        let clock = FixedClock::new(t0());
        let store = Arc::new(InMemoryReminderStore::new(Arc::new(clock.clone())));
        let fields = ReminderDraft::new("Stand-up", t0(), "ana@example.com")
            .validate()
            .unwrap();
        store
            .insert(Reminder::new(
                ReminderId::from_ulid(Ulid::new()),
                OwnerId::from_ulid(Ulid::new()),
                fields,
                t0(),
            ))
            .await
            .unwrap();
        Fixture { store, clock }
    }

    fn scheduler(f: &Fixture, notifier: Arc<dyn Notifier>, config: SchedulerConfig) -> SchedulerLoop {
        let clock: Arc<dyn Clock> = Arc::new(f.clock.clone());
        let engine = DueScanEngine::new(f.store.clone(), notifier, clock.clone(), &config);
        SchedulerLoop::new(engine, clock, &config)
    }

    fn config(tick: u64, notify_timeout: u64, shutdown_timeout: u64) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval_secs: tick,
            grace_period_secs: 3600,
            notify_timeout_secs: notify_timeout,
            shutdown_timeout_secs: shutdown_timeout,
            ..SchedulerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fire_immediately_then_on_interval() {
        let f = fixture().await;
        let outbox = Arc::new(OutboxNotifier::new());
        outbox.fail_all(true);
        let handle = scheduler(&f, outbox.clone(), config(60, 30, 30)).start();

        tokio::time::sleep(Duration::from_secs(150)).await;

        let status = handle.status();
        assert!(status.running);
        assert_eq!(status.ticks_run, 3);
        assert_eq!(status.failed_total, 3);
        assert_eq!(outbox.attempts(), 3);
        assert_eq!(handle.stop().await, ShutdownOutcome::Graceful);
    }

    #[tokio::test(start_paused = true)]
    async fn long_tick_skips_firings_instead_of_overlapping() {
        let f = fixture().await;
        let slow = Arc::new(Slow::new(Duration::from_secs(50), false));
        let handle = scheduler(&f, slow.clone(), config(20, 100, 100)).start();

        tokio::time::sleep(Duration::from_secs(200)).await;

        let status = handle.status();
        assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
        assert!(status.ticks_skipped > 0);
        assert!(status.ticks_run < 10);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_in_flight_tick() {
        let f = fixture().await;
        let slow = Arc::new(Slow::new(Duration::from_secs(10), true));
        let handle = scheduler(&f, slow.clone(), config(60, 30, 30)).start();
        let status_rx = handle.subscribe();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(slow.in_flight.load(Ordering::SeqCst), 1);

        assert_eq!(handle.stop().await, ShutdownOutcome::Graceful);

        let status = status_rx.borrow().clone();
        assert!(!status.running);
        assert_eq!(status.notified_total, 1);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_gives_up_after_shutdown_timeout() {
        let f = fixture().await;
        let slow = Arc::new(Slow::new(Duration::from_secs(50), true));
        let handle = scheduler(&f, slow.clone(), config(60, 55, 5)).start();

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.stop().await, ShutdownOutcome::Abandoned);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_ticks_do_not_stop_the_loop() {
        let f = fixture().await;
        let outbox = Arc::new(OutboxNotifier::new());
        f.store.set_available(false);
        let handle = scheduler(&f, outbox.clone(), config(60, 30, 30)).start();

        tokio::time::sleep(Duration::from_secs(130)).await;
        let status = handle.status();
        assert_eq!((status.ticks_run, status.ticks_failed), (3, 3));
        assert!(status.last_error.is_some());

        f.store.set_available(true);
        tokio::time::sleep(Duration::from_secs(60)).await;

        let status = handle.status();
        assert_eq!((status.ticks_run, status.ticks_failed), (4, 3));
        assert_eq!(status.notified_total, 1);
        assert_eq!(outbox.delivered().len(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_ends_the_loop() {
        let f = fixture().await;
        let handle = scheduler(&f, Arc::new(OutboxNotifier::new()), config(60, 30, 30)).start();
        let mut status_rx = handle.subscribe();

        drop(handle);
        while status_rx.borrow_and_update().running {
            if status_rx.changed().await.is_err() {
                break;
            }
        }

        assert!(!status_rx.borrow().running);
    }

    #[test]
    fn skipped_firings_counts_whole_intervals() {
        let interval = Duration::from_secs(60);
        assert_eq!(skipped_firings(Duration::from_secs(59), interval), 0);
        assert_eq!(skipped_firings(Duration::from_secs(60), interval), 1);
        assert_eq!(skipped_firings(Duration::from_secs(150), interval), 2);
    }
}
