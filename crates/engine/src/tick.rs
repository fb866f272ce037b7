use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::hooks::{self, HookOutcome};
use crate::world::position::BlockPos;
use crate::world::{Promotion, World};

/// Work run once per tick on the worker pool, concurrently with every other
/// task. Tasks read snapshots freely and issue delayed writes; none of their
/// writes are visible to snapshot reads until the tick ends.
pub trait TickTask: Send + Sync {
    fn name(&self) -> &str;

    /// `tick` is the snapshot generation being read (`world.tick()`).
    fn run(&self, world: &World, tick: u64);
}

/// What happened during one [`TickDriver::step`].
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tasks: usize,
    pub task_faults: usize,
    /// `on_update` hooks that ran to completion.
    pub updates: usize,
    /// Queued updates left for the next tick because of the per-tick cap.
    pub deferred_updates: usize,
    pub hook_faults: usize,
    pub promotion: Promotion,
    pub elapsed: Duration,
}

/// Drives a world through ticks:
///
/// 1. **work**: every [`TickTask`] runs in parallel;
/// 2. **updates**: queued physics updates are dispatched to `on_update`,
///    grouped by chunk column and run in parallel across columns;
/// 3. **promotion**: the live view becomes the new snapshot.
///
/// Updates scheduled while phase 2 runs are handled on the next tick.
pub struct TickDriver {
    pub max_updates_per_tick: usize,
}

impl TickDriver {
    pub fn new() -> Self {
        Self {
            max_updates_per_tick: 10_000,
        }
    }

    pub fn step(&self, world: &World, tasks: &[Box<dyn TickTask>]) -> TickReport {
        let started = Instant::now();
        let tick = world.tick();

        // ── Work phase ──────────────────────────────────────────────────
        let task_faults = tasks
            .par_iter()
            .filter(|task| !run_task(task.as_ref(), world, tick))
            .count();

        // ── Update phase ────────────────────────────────────────────────
        let mut pending = world.take_pending_updates();
        let deferred = pending.len().saturating_sub(self.max_updates_per_tick);
        if deferred > 0 {
            for pos in pending.drain(self.max_updates_per_tick..) {
                world.schedule_update(pos);
            }
        }

        let mut by_chunk: HashMap<_, Vec<BlockPos>> = HashMap::new();
        for pos in pending {
            by_chunk.entry(pos.chunk()).or_default().push(pos);
        }
        let groups: Vec<Vec<BlockPos>> = by_chunk.into_values().collect();

        let (updates, hook_faults) = groups
            .into_par_iter()
            .map(|group| {
                group
                    .into_iter()
                    .fold((0, 0), |(done, faults), pos| match hooks::dispatch_update(world, pos) {
                        HookOutcome::Completed => (done + 1, faults),
                        HookOutcome::Skipped => (done, faults),
                        HookOutcome::Faulted => (done, faults + 1),
                    })
            })
            .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

        // ── Tick boundary ───────────────────────────────────────────────
        let promotion = world.promote();

        let report = TickReport {
            tasks: tasks.len(),
            task_faults,
            updates,
            deferred_updates: deferred,
            hook_faults,
            promotion,
            elapsed: started.elapsed(),
        };
        tracing::trace!(?report, "tick complete");
        report
    }

    /// Run `ticks` consecutive steps. Returns the total number of completed
    /// updates.
    pub fn run(&self, world: &World, tasks: &[Box<dyn TickTask>], ticks: usize) -> usize {
        (0..ticks).map(|_| self.step(world, tasks).updates).sum()
    }

    /// Step with no tasks until the update queue drains, or `max_ticks`.
    /// Returns the number of ticks taken.
    pub fn run_until_quiet(&self, world: &World, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && world.pending_update_count() > 0 {
            self.step(world, &[]);
            ticks += 1;
        }
        ticks
    }
}

/// Run one task, containing a panic the same way hook faults are contained.
fn run_task(task: &dyn TickTask, world: &World, tick: u64) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| task.run(world, tick))) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                task = task.name(),
                tick,
                panic = hooks::panic_message(payload.as_ref()),
                "tick task panicked; remainder of its work skipped"
            );
            false
        }
    }
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new()
    }
}
