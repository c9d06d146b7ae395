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

//! A bounded pool of preemptive OS-thread workers pulling from an
//! unbounded MPMC job queue, with idle-sleep throttling on dequeue and a
//! long-task warning for jobs that run past [`LONG_TASK_WARN_SEC`].

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::warn;

/// Idle-sleep between empty dequeue attempts on either queue.
pub const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// A worker task that has been non-idle this long triggers a warning
/// (logged, not killed).
pub const LONG_TASK_WARN_SEC: u64 = 300;

struct WorkerSlot {
    started_at: Mutex<Option<Instant>>,
    warned: AtomicBool,
}

impl WorkerSlot {
    fn new() -> Self {
        Self { started_at: Mutex::new(None), warned: AtomicBool::new(false) }
    }

    fn begin(&self) {
        *self.started_at.lock() = Some(Instant::now());
        self.warned.store(false, Ordering::Relaxed);
    }

    fn end(&self) {
        *self.started_at.lock() = None;
    }
}

/// Runs `job_fn` across `pool_size` worker threads, each pulling from a
/// single shared unbounded queue. Results are pushed to a second
/// unbounded queue for the master to drain at its own pace.
///
/// Dropping (or calling [`WorkerPool::shutdown`] on) the pool sets the
/// quit flag and joins every worker; in-flight jobs finish naturally,
/// matching the "quit-on-error" contract: abort pending work, let
/// running tasks complete.
pub struct WorkerPool<J, R> {
    job_tx: Sender<J>,
    result_rx: Receiver<R>,
    quit: Arc<AtomicBool>,
    slots: Vec<Arc<WorkerSlot>>,
    handles: Vec<JoinHandle<()>>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(pool_size: usize, job_fn: F) -> Self
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let pool_size = pool_size.max(1);
        let (job_tx, job_rx) = unbounded::<J>();
        let (result_tx, result_rx) = unbounded::<R>();
        let quit = Arc::new(AtomicBool::new(false));
        let job_fn = Arc::new(job_fn);

        let mut slots = Vec::with_capacity(pool_size);
        let mut handles = Vec::with_capacity(pool_size);
        for worker_id in 0..pool_size {
            let slot = Arc::new(WorkerSlot::new());
            slots.push(Arc::clone(&slot));
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let quit = Arc::clone(&quit);
            let job_fn = Arc::clone(&job_fn);
            handles.push(
                thread::Builder::new()
                    .name(format!("scheduler-worker-{worker_id}"))
                    .spawn(move || loop {
                        if quit.load(Ordering::Relaxed) {
                            break;
                        }
                        match job_rx.recv_timeout(IDLE_SLEEP) {
                            Ok(job) => {
                                slot.begin();
                                let result = job_fn(job);
                                slot.end();
                                if result_tx.send(result).is_err() {
                                    break;
                                }
                            }
                            Err(RecvTimeoutError::Timeout) => continue,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    })
                    .expect("failed to spawn scheduler worker thread"),
            );
        }

        Self { job_tx, result_rx, quit, slots, handles }
    }

    /// Enqueues a job. Never blocks; the queue is unbounded.
    pub fn submit(&self, job: J) {
        let _ = self.job_tx.send(job);
    }

    /// Drains every result currently available without blocking.
    pub fn try_drain_results(&self) -> Vec<R> {
        let mut out = Vec::new();
        while let Ok(r) = self.result_rx.try_recv() {
            out.push(r);
        }
        out
    }

    /// Blocks up to `timeout` for at least one result, then drains
    /// whatever else is immediately available. Used by the master's
    /// dequeue loop so it idle-sleeps rather than busy-polls.
    pub fn recv_results(&self, timeout: Duration) -> Vec<R> {
        let mut out = Vec::new();
        match self.result_rx.recv_timeout(timeout) {
            Ok(first) => out.push(first),
            Err(_) => return out,
        }
        out.extend(self.try_drain_results());
        out
    }

    /// Logs a warning for every worker whose current job has been
    /// running longer than [`LONG_TASK_WARN_SEC`]. Call periodically
    /// from the master's dequeue loop; each task is warned about once.
    pub fn check_long_tasks(&self) {
        for (worker_id, slot) in self.slots.iter().enumerate() {
            let started_at = *slot.started_at.lock();
            if let Some(started_at) = started_at {
                let elapsed = started_at.elapsed();
                if elapsed.as_secs() >= LONG_TASK_WARN_SEC && !slot.warned.swap(true, Ordering::Relaxed) {
                    warn!(worker_id, elapsed_sec = elapsed.as_secs(), "worker task exceeded long-task threshold");
                }
            }
        }
    }

    /// Sets the quit flag (workers exit after finishing any in-flight
    /// job) without waiting for them to join.
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Relaxed);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    /// Sets the quit flag and joins every worker thread.
    pub fn shutdown(mut self) {
        self.quit.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn submitted_jobs_are_processed_and_results_collected() {
        let pool = WorkerPool::new(2, |n: i32| n * 2);
        for i in 0..10 {
            pool.submit(i);
        }
        let mut results = Vec::new();
        while results.len() < 10 {
            results.extend(pool.recv_results(StdDuration::from_millis(200)));
        }
        results.sort_unstable();
        assert_eq!(results, (0..10).map(|n| n * 2).collect::<Vec<_>>());
        pool.shutdown();
    }

    #[test]
    fn quit_requested_reflects_request_quit() {
        let pool: WorkerPool<(), ()> = WorkerPool::new(1, |_| ());
        assert!(!pool.quit_requested());
        pool.request_quit();
        assert!(pool.quit_requested());
        pool.shutdown();
    }
}
