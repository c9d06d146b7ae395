// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.

//! The outer master: owns the tile-tree build state machine, gates each
//! tile's build task on its dependencies being marked built, and hands
//! ready work to the [`WorkerPool`]. Consumes one status message at a
//! time; the pool itself does the actual data-parallel work.

use crate::message::{TileJob, TileOutcome};
use crate::pool::WorkerPool;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, error};

/// Outer-queue dequeue throttle, matching the worker pool's idle sleep.
const MASTER_IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Drives tile builds to completion: only submits a tile to the worker
/// pool once every id in `dependencies_of(tile_id)` is in `built`. A
/// dependency that ends up `failed` poisons everything that (directly or
/// transitively) depends on it, without ever submitting those jobs.
pub struct Master {
    pool: WorkerPool<TileJob, TileOutcome>,
    pending: VecDeque<TileJob>,
    built: HashSet<String>,
    failed: HashSet<String>,
    in_flight: usize,
    quit_on_error: bool,
    aborted: bool,
}

impl Master {
    pub fn new(pool: WorkerPool<TileJob, TileOutcome>, quit_on_error: bool) -> Self {
        Self {
            pool,
            pending: VecDeque::new(),
            built: HashSet::new(),
            failed: HashSet::new(),
            in_flight: 0,
            quit_on_error,
            aborted: false,
        }
    }

    /// Enqueues `tile_id` for eventual build, once its dependencies are built.
    pub fn enqueue(&mut self, tile_id: impl Into<String>) {
        self.pending.push_back(TileJob::new(tile_id));
    }

    pub fn is_built(&self, tile_id: &str) -> bool {
        self.built.contains(tile_id)
    }

    pub fn is_failed(&self, tile_id: &str) -> bool {
        self.failed.contains(tile_id)
    }

    /// Runs the master state machine to completion: repeatedly tries to
    /// promote ready pending tiles to the worker pool, drains worker
    /// results, and checks for long-running tasks, until there is
    /// nothing left pending or in flight.
    ///
    /// Returns `true` on success (every enqueued tile built), `false` if
    /// any tile failed (and, with `quit_on_error`, pending work was
    /// aborted).
    pub fn drive(&mut self, dependencies_of: impl Fn(&str) -> Vec<String>) -> bool {
        loop {
            self.promote_ready(&dependencies_of);

            if self.pending.is_empty() && self.in_flight == 0 {
                break;
            }

            let results = self.pool.recv_results(MASTER_IDLE_SLEEP);
            if results.is_empty() {
                self.pool.check_long_tasks();
                continue;
            }
            for outcome in results {
                self.in_flight = self.in_flight.saturating_sub(1);
                match outcome {
                    TileOutcome::Built { tile_id } => {
                        debug!(tile_id, "tile built");
                        self.built.insert(tile_id);
                    }
                    TileOutcome::Failed { tile_id, reason } => {
                        error!(tile_id, reason, "tile build failed");
                        self.failed.insert(tile_id);
                        if self.quit_on_error {
                            self.abort_pending();
                        }
                    }
                }
            }
        }
        self.failed.is_empty()
    }

    fn promote_ready(&mut self, dependencies_of: &impl Fn(&str) -> Vec<String>) {
        if self.aborted {
            return;
        }
        let mut requeue = VecDeque::new();
        while let Some(job) = self.pending.pop_front() {
            let deps = dependencies_of(&job.tile_id);
            if deps.iter().any(|d| self.failed.contains(d)) {
                self.failed.insert(job.tile_id.clone());
                continue;
            }
            if deps.iter().all(|d| self.built.contains(d)) {
                self.in_flight += 1;
                self.pool.submit(job);
            } else {
                requeue.push_back(job);
            }
        }
        self.pending = requeue;
    }

    /// Drops every not-yet-submitted pending tile and stops the pool
    /// from picking up further work; jobs already running finish
    /// naturally.
    fn abort_pending(&mut self) {
        self.aborted = true;
        self.pending.clear();
        self.pool.request_quit();
    }

    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pool() -> WorkerPool<TileJob, TileOutcome> {
        WorkerPool::new(2, |job: TileJob| TileOutcome::Built { tile_id: job.tile_id })
    }

    #[test]
    fn tiles_build_only_after_their_dependency_is_built() {
        let mut master = Master::new(make_pool(), false);
        master.enqueue("child");
        master.enqueue("root");
        let deps = |id: &str| if id == "child" { vec!["root".to_string()] } else { vec![] };
        let ok = master.drive(deps);
        assert!(ok);
        assert!(master.is_built("root"));
        assert!(master.is_built("child"));
    }

    #[test]
    fn a_failed_dependency_poisons_its_dependents() {
        let pool = WorkerPool::new(1, |job: TileJob| {
            if job.tile_id == "root" {
                TileOutcome::Failed { tile_id: job.tile_id, reason: "boom".to_string() }
            } else {
                TileOutcome::Built { tile_id: job.tile_id }
            }
        });
        let mut master = Master::new(pool, false);
        master.enqueue("root");
        master.enqueue("child");
        let deps = |id: &str| if id == "child" { vec!["root".to_string()] } else { vec![] };
        let ok = master.drive(deps);
        assert!(!ok);
        assert!(master.is_failed("root"));
        assert!(master.is_failed("child"));
        assert!(!master.is_built("child"));
    }
}
