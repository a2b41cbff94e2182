// ABOUTME: Background health monitors with an explicit start/stop lifecycle.
// ABOUTME: Each monitor runs one cycle per interval on its own task until stopped.

mod heartbeat;
mod poller;
mod watchdog;

pub use heartbeat::{HeartbeatError, HeartbeatPayload, HeartbeatReceiver};
pub use poller::{
    AgentCounts, PollSummary, PollerSettings, ProbeError, ResourceUsage, StatusReport,
    SwarmPoller, determine_status,
};
pub use watchdog::{HeartbeatWatchdog, WatchdogReport, WatchdogSettings};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// One pass of a recurring monitor. Implementations catch and log their own
/// failures; a cycle never ends the loop.
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run_cycle(&self);
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub name: &'static str,
    pub running: bool,
    pub interval_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Stats {
    cycles: AtomicU64,
    last_cycle_at: Mutex<Option<DateTime<Utc>>>,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

/// Owns the background task for one [`Cycle`].
pub struct Monitor<C: Cycle> {
    cycle: Arc<C>,
    interval: Duration,
    stats: Arc<Stats>,
    running: Mutex<Option<Running>>,
}

impl<C: Cycle> Monitor<C> {
    pub fn new(cycle: Arc<C>, interval: Duration) -> Self {
        Self {
            cycle,
            interval,
            stats: Arc::new(Stats::default()),
            running: Mutex::new(None),
        }
    }

    pub fn cycle(&self) -> &Arc<C> {
        &self.cycle
    }

    /// Start the loop. The first cycle runs immediately. Returns `false` if
    /// the monitor was already running. Must be called inside a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            tracing::debug!(monitor = self.cycle.name(), "monitor already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.cycle.clone(),
            self.interval,
            self.stats.clone(),
            cancel.clone(),
        ));
        *running = Some(Running {
            cancel,
            handle,
            started_at: Utc::now(),
        });
        tracing::info!(
            monitor = self.cycle.name(),
            interval_secs = self.interval.as_secs(),
            "monitor started"
        );
        true
    }

    /// Stop the loop and wait for the in-flight cycle to wind down.
    /// Returns `false` if the monitor was not running.
    pub async fn stop(&self) -> bool {
        let Some(running) = self.running.lock().take() else {
            return false;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            tracing::warn!(monitor = self.cycle.name(), error = %e, "monitor task ended abnormally");
        }
        tracing::info!(monitor = self.cycle.name(), "monitor stopped");
        true
    }

    pub fn status(&self) -> MonitorStatus {
        let running = self.running.lock();
        let active = running.as_ref().filter(|r| !r.handle.is_finished());
        MonitorStatus {
            name: self.cycle.name(),
            running: active.is_some(),
            interval_secs: self.interval.as_secs(),
            started_at: active.map(|r| r.started_at),
            cycles: self.stats.cycles.load(Ordering::Relaxed),
            last_cycle_at: *self.stats.last_cycle_at.lock(),
        }
    }
}

/// `now - age`, saturating at the earliest representable time.
fn cutoff(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

async fn run_loop<C: Cycle>(
    cycle: Arc<C>,
    interval: Duration,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = cycle.run_cycle() => {
                stats.cycles.fetch_add(1, Ordering::Relaxed);
                *stats.last_cycle_at.lock() = Some(Utc::now());
            }
        }
    }
}
