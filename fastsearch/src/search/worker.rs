//! Scan worker threads.
//!
//! Each worker:
//! - Pulls a directory from the shared [`WorkQueue`](super::queue::WorkQueue)
//! - Lists its immediate entries without holding any lock
//! - Pushes sub-directories back onto the queue
//! - Tests every other entry against the query and records matches
//!
//! A worker exits once the queue is empty and no peer can refill it, or as
//! soon as it sees the session's cancellation flag.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

use super::queue::Dequeue;
use super::session::SharedState;
use crate::errors::{SearchError, SearchResult};

/// Handle to one running scan thread
#[derive(Debug)]
pub struct ScanWorker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl ScanWorker {
    /// Spawn a new worker thread
    pub(crate) fn spawn(id: usize, shared: Arc<SharedState>) -> SearchResult<Self> {
        let handle = thread::Builder::new()
            .name(format!("scan-{}", id))
            .spawn(move || worker_loop(id, &shared))
            .map_err(|e| SearchError::worker_spawn(id, e))?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Wait for the worker to reach its drained state
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = self.id, "Scan worker panicked");
            }
        }
    }
}

fn worker_loop(id: usize, shared: &SharedState) {
    trace!(worker = id, "Scan worker starting");
    let mut last_yield = Instant::now();

    loop {
        match shared.queue.pop_or_drain(|| shared.is_cancelled()) {
            Dequeue::Item(dir) => {
                scan_directory(id, &dir, shared, &mut last_yield);
                shared.queue.finish();
            }
            Dequeue::Drained { last } => {
                trace!(worker = id, last, "Scan worker drained");
                if last {
                    shared.complete();
                }
                break;
            }
        }
    }
}

/// Lists one directory. Errors never escape: an unreadable directory or a
/// failing entry just ends this directory's scan.
fn scan_directory(id: usize, dir: &Path, shared: &SharedState, last_yield: &mut Instant) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(worker = id, path = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };
    shared.metrics.record_dir();

    for entry in entries {
        if shared.is_cancelled() {
            trace!(worker = id, path = %dir.display(), "Cancelled mid-directory");
            return;
        }

        maybe_yield(last_yield, shared.yield_interval);

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(worker = id, path = %dir.display(), error = %e, "Directory listing failed");
                return;
            }
        };

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                debug!(worker = id, path = %entry.path().display(), error = %e, "Entry vanished");
                continue;
            }
        };

        let path = entry.path();
        if shared.ignore.is_ignored(&path) {
            continue;
        }

        if file_type.is_dir() {
            shared.queue.push(path);
            continue;
        }

        // Links are never followed. A link to a directory is neither walked
        // nor counted; any other link (dangling included) is tested as a file.
        if file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_dir()) {
            trace!(worker = id, path = %path.display(), "Skipping directory symlink");
            continue;
        }

        if shared.matcher.matches_file(&path) {
            shared.record_match(path);
        }
        shared.metrics.record_file();
    }
}

/// Gives up the time slice at most once per `interval`
fn maybe_yield(last_yield: &mut Instant, interval: Duration) {
    let now = Instant::now();
    if now.duration_since(*last_yield) > interval {
        thread::yield_now();
        *last_yield = now;
    }
}
