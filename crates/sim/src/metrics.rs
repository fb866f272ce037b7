//! Lock-free tick counters.
//!
//! The tick loop bumps these with relaxed atomic adds after every step;
//! [`Metrics::snapshot`] reads them at its own pace and never blocks a tick.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

use cubestate_engine::tick::TickReport;
use serde::Serialize;

pub struct Metrics {
    // Monotonic counters
    ticks: AtomicU64,
    tasks_run: AtomicU64,
    task_faults: AtomicU64,
    updates: AtomicU64,
    deferred_updates: AtomicU64,
    hook_faults: AtomicU64,
    sections_promoted: AtomicU64,
    cells_promoted: AtomicU64,
    tick_ns_sum: AtomicU64,
    tick_ns_max: AtomicU64,

    // Tick duration histogram buckets
    hist_under_1ms: AtomicU64,
    hist_1_5ms: AtomicU64,
    hist_5_20ms: AtomicU64,
    hist_20_50ms: AtomicU64,
    hist_over_50ms: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            tasks_run: AtomicU64::new(0),
            task_faults: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deferred_updates: AtomicU64::new(0),
            hook_faults: AtomicU64::new(0),
            sections_promoted: AtomicU64::new(0),
            cells_promoted: AtomicU64::new(0),
            tick_ns_sum: AtomicU64::new(0),
            tick_ns_max: AtomicU64::new(0),
            hist_under_1ms: AtomicU64::new(0),
            hist_1_5ms: AtomicU64::new(0),
            hist_5_20ms: AtomicU64::new(0),
            hist_20_50ms: AtomicU64::new(0),
            hist_over_50ms: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Fold one tick's report into the counters.
    pub fn record_tick(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Relaxed);
        self.tasks_run.fetch_add(report.tasks as u64, Relaxed);
        self.task_faults.fetch_add(report.task_faults as u64, Relaxed);
        self.updates.fetch_add(report.updates as u64, Relaxed);
        self.deferred_updates
            .fetch_add(report.deferred_updates as u64, Relaxed);
        self.hook_faults.fetch_add(report.hook_faults as u64, Relaxed);
        self.sections_promoted
            .fetch_add(report.promotion.sections as u64, Relaxed);
        self.cells_promoted
            .fetch_add(report.promotion.cells_changed as u64, Relaxed);
        self.record_duration(report.elapsed);
    }

    fn record_duration(&self, elapsed: Duration) {
        let ns = elapsed.as_nanos() as u64;
        self.tick_ns_sum.fetch_add(ns, Relaxed);
        self.tick_ns_max.fetch_max(ns, Relaxed);

        let bucket = match elapsed.as_millis() {
            0 => &self.hist_under_1ms,
            1..=4 => &self.hist_1_5ms,
            5..=19 => &self.hist_5_20ms,
            20..=49 => &self.hist_20_50ms,
            _ => &self.hist_over_50ms,
        };
        bucket.fetch_add(1, Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Relaxed)
    }

    /// Read all counters into a serializable snapshot.
    pub fn snapshot(&self, chunks_loaded: u64) -> MetricsSnapshot {
        let ticks = self.ticks.load(Relaxed);
        let tick_ns_sum = self.tick_ns_sum.load(Relaxed);
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            ticks,
            tasks_run: self.tasks_run.load(Relaxed),
            task_faults: self.task_faults.load(Relaxed),
            updates: self.updates.load(Relaxed),
            deferred_updates: self.deferred_updates.load(Relaxed),
            hook_faults: self.hook_faults.load(Relaxed),
            sections_promoted: self.sections_promoted.load(Relaxed),
            cells_promoted: self.cells_promoted.load(Relaxed),
            mean_tick_us: if ticks == 0 {
                0.0
            } else {
                tick_ns_sum as f64 / ticks as f64 / 1_000.0
            },
            max_tick_us: self.tick_ns_max.load(Relaxed) as f64 / 1_000.0,
            chunks_loaded,
            hist: [
                self.hist_under_1ms.load(Relaxed),
                self.hist_1_5ms.load(Relaxed),
                self.hist_5_20ms.load(Relaxed),
                self.hist_20_50ms.load(Relaxed),
                self.hist_over_50ms.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable snapshot of all counters at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub ticks: u64,
    pub tasks_run: u64,
    pub task_faults: u64,
    pub updates: u64,
    pub deferred_updates: u64,
    pub hook_faults: u64,
    pub sections_promoted: u64,
    pub cells_promoted: u64,
    pub mean_tick_us: f64,
    pub max_tick_us: f64,
    pub chunks_loaded: u64,
    /// `[<1ms, 1-5ms, 5-20ms, 20-50ms, >50ms]`
    pub hist: [u64; 5],
}
