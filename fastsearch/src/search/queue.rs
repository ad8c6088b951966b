//! Shared queue of directories waiting to be listed.
//!
//! Besides the FIFO itself the queue tracks how many workers are busy listing
//! a directory and how many are still alive. Both counts live under the same
//! mutex as the items, so "queue is empty and nobody can refill it" is decided
//! atomically and two workers can never both miss the final wake-up.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Outcome of asking the queue for work
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue {
    /// A directory to list. The caller must report back with
    /// [`WorkQueue::finish`] once it is done with it.
    Item(PathBuf),
    /// No more work for this worker. `last` is true for exactly one worker per
    /// run: the one whose exit dropped the live-worker count to zero.
    Drained { last: bool },
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<PathBuf>,
    /// Workers currently listing a directory
    busy: usize,
    /// Workers that have not yet drained
    active: usize,
    /// Set once the queue can never produce more work
    closed: bool,
}

/// Thread-safe FIFO of directory paths
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl WorkQueue {
    /// Creates a queue holding `root`, to be drained by `workers` workers
    pub fn seeded(root: PathBuf, workers: usize) -> Self {
        let mut items = VecDeque::new();
        items.push_back(root);
        Self {
            state: Mutex::new(QueueState {
                items,
                busy: 0,
                active: workers,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a directory
    pub fn push(&self, path: PathBuf) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.items.push_back(path);
        drop(state);
        self.available.notify_one();
    }

    /// Number of directories waiting. Only meant for progress estimates.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the next directory, waiting while the queue is empty but some
    /// other worker may still push more. `cancelled` is polled on every
    /// wake-up; once it returns true the worker drains immediately.
    pub fn pop_or_drain(&self, cancelled: impl Fn() -> bool) -> Dequeue {
        let mut state = self.lock();
        loop {
            if cancelled() {
                state.closed = true;
                state.items.clear();
                break;
            }
            if let Some(path) = state.items.pop_front() {
                state.busy += 1;
                return Dequeue::Item(path);
            }
            if state.busy == 0 || state.closed {
                state.closed = true;
                break;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        state.active = state.active.saturating_sub(1);
        let last = state.active == 0;
        drop(state);
        self.available.notify_all();
        Dequeue::Drained { last }
    }

    /// Marks the directory handed out by [`pop_or_drain`](Self::pop_or_drain)
    /// as fully listed.
    pub fn finish(&self) {
        let mut state = self.lock();
        state.busy = state.busy.saturating_sub(1);
        let exhausted = state.busy == 0 && state.items.is_empty();
        drop(state);
        if exhausted {
            self.available.notify_all();
        }
    }

    /// Removes `workers` that were counted but never started. Returns true if
    /// no live worker is left to finish the run.
    pub fn abandon(&self, workers: usize) -> bool {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(workers);
        state.active == 0
    }

    /// Wakes every idle worker so it re-checks its cancellation flag.
    pub fn interrupt(&self) {
        let _state = self.lock();
        self.available.notify_all();
    }
}
