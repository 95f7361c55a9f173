//! Task Pool
//!
//! A bounded worker pool for running dataset load/save off the caller's
//! thread. Tracked units carry a per-unit result slot the caller can poll
//! after completion; `wait_all` is a completion barrier, NOT a success
//! signal — unit errors are logged and kept in the slot, never re-raised.
//!
//! No cancellation or timeout is supported: a unit that never completes
//! stalls `wait_all` indefinitely. Callers needing a bounded wait must add
//! a watchdog outside this component.
//!
//! The pool is a constructed instance injected where needed, not a hidden
//! global, so tests can substitute a small or single-worker pool.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

pub const DEFAULT_WORKERS: usize = 2;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct SlotState {
    done: bool,
    result: Option<Result<()>>,
}

struct TaskSlot {
    state: Mutex<SlotState>,
    cvar: Condvar,
}

/// Completion handle for one tracked unit of work.
#[derive(Clone)]
pub struct TaskHandle {
    label: String,
    slot: Arc<TaskSlot>,
}

impl TaskHandle {
    fn new(label: String) -> Self {
        Self {
            label,
            slot: Arc::new(TaskSlot {
                state: Mutex::new(SlotState {
                    done: false,
                    result: None,
                }),
                cvar: Condvar::new(),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_done(&self) -> bool {
        self.slot.state.lock().done
    }

    /// Block until the unit finishes.
    pub fn wait(&self) {
        let mut state = self.slot.state.lock();
        while !state.done {
            self.slot.cvar.wait(&mut state);
        }
    }

    /// Take the unit's outcome, if it has finished. The error stays
    /// available here even though `wait_all` only logged it.
    pub fn result(&self) -> Option<Result<()>> {
        self.slot.state.lock().result.take()
    }

    fn complete(&self, result: Result<()>) {
        let mut state = self.slot.state.lock();
        state.result = Some(result);
        state.done = true;
        self.slot.cvar.notify_all();
    }
}

struct Workers {
    sender: Sender<Job>,
    handles: Vec<JoinHandle<()>>,
}

pub struct TaskPool {
    workers: Mutex<Workers>,
    tracked: Mutex<Vec<TaskHandle>>,
    size: Mutex<usize>,
}

impl TaskPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pool = Self {
            workers: Mutex::new(Self::spawn_workers(workers)),
            tracked: Mutex::new(Vec::new()),
            size: Mutex::new(workers),
        };
        log::info!("task pool initialized with {} worker(s)", workers);
        pool
    }

    fn spawn_workers(count: usize) -> Workers {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..count)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("pool-worker-{}", i))
                    .spawn(move || worker_loop(receiver))
                    .expect("failed to spawn pool worker")
            })
            .collect();
        Workers { sender, handles }
    }

    pub fn worker_count(&self) -> usize {
        *self.size.lock()
    }

    /// Enqueue a unit of work and track its completion handle.
    pub fn submit<F>(&self, label: impl Into<String>, work: F) -> TaskHandle
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.prune_finished();

        let handle = TaskHandle::new(label.into());
        let completion = handle.clone();
        let job: Job = Box::new(move || {
            let result = work();
            if let Err(e) = &result {
                log::warn!("task '{}' failed: {}", completion.label(), e);
            }
            completion.complete(result);
        });

        self.enqueue(job);
        self.tracked.lock().push(handle.clone());
        handle
    }

    /// Enqueue without tracking (fire-and-forget).
    pub fn submit_untracked<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(work));
    }

    fn enqueue(&self, job: Job) {
        let workers = self.workers.lock();
        // Send can only fail if every worker has exited, which cannot
        // happen while the pool owns the join handles.
        let _ = workers.sender.send(job);
    }

    /// Block until every tracked unit has finished, then clear the
    /// tracking set. Signals completion only: unit errors were already
    /// logged at the unit boundary and remain in each handle's slot.
    pub fn wait_all(&self) {
        let handles: Vec<TaskHandle> = std::mem::take(&mut *self.tracked.lock());
        for handle in &handles {
            handle.wait();
        }
        log::info!("all {} tracked task(s) completed", handles.len());
    }

    fn prune_finished(&self) {
        self.tracked.lock().retain(|h| !h.is_done());
    }

    /// Replace the worker set. Rejected while tracked units are
    /// outstanding.
    pub fn resize(&self, workers: usize) -> Result<()> {
        self.prune_finished();
        let outstanding = self.tracked.lock().len();
        if outstanding > 0 {
            return Err(Error::PoolBusy { outstanding });
        }

        let workers = workers.max(1);
        let mut current = self.workers.lock();
        let old = std::mem::replace(&mut *current, Self::spawn_workers(workers));
        *self.size.lock() = workers;
        drop(current);

        // Dropping the old sender lets the old workers drain and exit.
        drop(old.sender);
        for handle in old.handles {
            let _ = handle.join();
        }
        log::info!("task pool resized to {} worker(s)", workers);
        Ok(())
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        let workers = self.workers.get_mut();
        // Close the channel so workers exit once the queue drains.
        let (closed, _) = mpsc::channel::<Job>();
        let old_sender = std::mem::replace(&mut workers.sender, closed);
        drop(old_sender);
        for handle in workers.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let guard = receiver.lock();
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            Err(_) => break, // channel closed, pool shut down
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn wait_all_is_a_completion_barrier() {
        let pool = TaskPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.submit("count", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        pool.wait_all();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn unit_error_is_swallowed_by_wait_all_but_kept_in_slot() {
        let pool = TaskPool::new(1);
        let handle = pool.submit("failing", || {
            Err(Error::UnscoredPatternName {
                pattern: "bogus".to_string(),
            })
        });
        pool.wait_all(); // must not panic or propagate
        let result = handle.result().expect("slot holds the outcome");
        assert!(matches!(
            result,
            Err(Error::UnscoredPatternName { .. })
        ));
    }

    #[test]
    fn resize_rejected_while_units_outstanding() {
        let pool = TaskPool::new(1);
        let (tx, rx) = mpsc::channel::<()>();
        pool.submit("blocker", move || {
            let _ = rx.recv();
            Ok(())
        });
        let err = pool.resize(4).unwrap_err();
        assert!(matches!(err, Error::PoolBusy { .. }));

        tx.send(()).unwrap();
        pool.wait_all();
        pool.resize(4).unwrap();
        assert_eq!(pool.worker_count(), 4);
    }

    #[test]
    fn untracked_work_runs() {
        let pool = TaskPool::new(1);
        let (tx, rx) = mpsc::channel::<u32>();
        pool.submit_untracked(move || {
            let _ = tx.send(7);
        });
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap(), 7);
    }
}
