use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

use super::matcher::{PatternMatcher, Query};
use super::queue::WorkQueue;
use super::worker::ScanWorker;
use crate::config::{default_thread_count, SearchConfig};
use crate::errors::SearchResult;
use crate::filters::IgnoreFilter;
use crate::metrics::{ScanMetrics, ScanStats};
use crate::results::SearchSnapshot;

/// Pool and traversal settings that stay fixed across the runs of a session
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub thread_count: NonZeroUsize,
    pub yield_interval: Duration,
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            thread_count: default_thread_count(),
            yield_interval: Duration::from_millis(1),
            ignore_patterns: Vec::new(),
        }
    }
}

impl From<&SearchConfig> for ScanSettings {
    fn from(config: &SearchConfig) -> Self {
        Self {
            thread_count: config.thread_count,
            yield_interval: config.yield_interval(),
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }
}

/// State of one run, shared between the session and its workers
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) queue: WorkQueue,
    pub(crate) metrics: ScanMetrics,
    pub(crate) matcher: PatternMatcher,
    pub(crate) ignore: IgnoreFilter,
    pub(crate) yield_interval: Duration,
    results: Mutex<Vec<PathBuf>>,
    cancelled: AtomicBool,
    running: AtomicBool,
    started_at: Instant,
    finished_at: OnceLock<Instant>,
}

impl SharedState {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.queue.interrupt();
    }

    pub(crate) fn record_match(&self, path: PathBuf) {
        self.metrics.record_match();
        self.lock_results().push(path);
    }

    fn lock_results(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called once per run by whoever retires the last worker
    pub(crate) fn complete(&self) {
        let finished_at = *self.finished_at.get_or_init(Instant::now);
        self.running.store(false, Ordering::Release);

        let stats = self.metrics.stats();
        info!(
            files = stats.files_processed,
            matches = stats.matches_found,
            cancelled = self.is_cancelled(),
            elapsed_ms = finished_at.duration_since(self.started_at).as_millis() as u64,
            "Search complete"
        );
        self.metrics.log_stats();
    }

    fn elapsed(&self) -> Duration {
        match self.finished_at.get() {
            Some(finished_at) => finished_at.duration_since(self.started_at),
            None => self.started_at.elapsed(),
        }
    }
}

/// Runs searches in the background and exposes their progress.
///
/// [`start`](Self::start) returns as soon as the worker pool is up. Callers
/// then poll [`snapshot`](Self::snapshot) (or the cheaper single-value
/// accessors) as often as they like, typically once per UI frame, and may
/// [`cancel`](Self::cancel) at any time. A session runs at most one search at
/// a time; starting a new one first waits for the previous pool to exit.
///
/// ```rust,no_run
/// use fastsearch::{Query, SearchSession};
///
/// let mut session = SearchSession::new();
/// session.start(Query::literal("invoice"), "/home/me/documents")?;
/// while session.is_running() {
///     let snapshot = session.snapshot();
///     println!("{} files, {} matches", snapshot.files_processed, snapshot.matches_found);
///     std::thread::sleep(std::time::Duration::from_millis(16));
/// }
/// # Ok::<(), fastsearch::SearchError>(())
/// ```
#[derive(Debug, Default)]
pub struct SearchSession {
    settings: ScanSettings,
    shared: Option<Arc<SharedState>>,
    workers: Vec<ScanWorker>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ScanSettings) -> Self {
        Self {
            settings,
            shared: None,
            workers: Vec::new(),
        }
    }

    pub fn with_config(config: &SearchConfig) -> Self {
        Self::with_settings(ScanSettings::from(config))
    }

    /// Starts searching `root` for `query` and returns immediately.
    ///
    /// Blocks only while a previous run's workers finish. A root that does
    /// not exist or cannot be listed gives an empty, completed run. Fails only
    /// if a worker thread cannot be spawned, in which case the partial pool
    /// is cancelled.
    pub fn start(&mut self, query: Query, root: impl Into<PathBuf>) -> SearchResult<()> {
        self.join();

        let root = root.into();
        let thread_count = self.settings.thread_count.get();
        let metrics = ScanMetrics::new();
        let matcher = PatternMatcher::with_metrics(query, &metrics);

        info!(
            pattern = %matcher.query().text,
            regex = matcher.query().is_regex,
            case_sensitive = matcher.query().case_sensitive,
            root = %root.display(),
            threads = thread_count,
            "Starting search"
        );

        let shared = Arc::new(SharedState {
            queue: WorkQueue::seeded(root, thread_count),
            metrics,
            matcher,
            ignore: IgnoreFilter::new(&self.settings.ignore_patterns),
            yield_interval: self.settings.yield_interval,
            results: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            running: AtomicBool::new(true),
            started_at: Instant::now(),
            finished_at: OnceLock::new(),
        });
        self.shared = Some(Arc::clone(&shared));

        for id in 0..thread_count {
            match ScanWorker::spawn(id, Arc::clone(&shared)) {
                Ok(worker) => self.workers.push(worker),
                Err(e) => {
                    shared.cancel();
                    if shared.queue.abandon(thread_count - id) {
                        shared.complete();
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Asks the workers to stop. Does not wait for them.
    pub fn cancel(&self) {
        if let Some(shared) = &self.shared {
            shared.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.as_ref().is_some_and(|s| s.is_cancelled())
    }

    /// True until the last worker of the current run has drained
    pub fn is_running(&self) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::Acquire))
    }

    pub fn files_processed(&self) -> u64 {
        self.stats().files_processed
    }

    pub fn matches_found(&self) -> u64 {
        self.stats().matches_found
    }

    /// Time since the current run started, frozen once it completes
    pub fn elapsed(&self) -> Duration {
        self.shared
            .as_ref()
            .map(|s| s.elapsed())
            .unwrap_or_default()
    }

    /// Current counters without copying results
    pub fn stats(&self) -> ScanStats {
        self.shared
            .as_ref()
            .map(|s| s.metrics.stats())
            .unwrap_or_default()
    }

    /// Directories waiting to be listed, 0 when idle
    pub fn queue_depth(&self) -> usize {
        self.shared.as_ref().map(|s| s.queue.len()).unwrap_or_default()
    }

    /// Copies out the current progress and every result found so far
    pub fn snapshot(&self) -> SearchSnapshot {
        let Some(shared) = &self.shared else {
            return SearchSnapshot::default();
        };

        // Read the flag first so a "finished" snapshot always carries the
        // final counters.
        let running = shared.running.load(Ordering::Acquire);
        let stats = shared.metrics.stats();
        SearchSnapshot {
            files_processed: stats.files_processed,
            matches_found: stats.matches_found,
            dirs_scanned: stats.dirs_scanned,
            queue_depth: shared.queue.len(),
            running,
            elapsed: shared.elapsed(),
            results: shared.lock_results().clone(),
        }
    }

    /// Results appended after the first `offset` ones, for pollers that
    /// keep their own copy and only want what is new.
    pub fn results_since(&self, offset: usize) -> Vec<PathBuf> {
        match &self.shared {
            Some(shared) => {
                let results = shared.lock_results();
                results.get(offset..).map(<[PathBuf]>::to_vec).unwrap_or_default()
            }
            None => Vec::new(),
        }
    }

    /// Blocks until every worker of the current run has drained
    pub fn join(&mut self) {
        for worker in self.workers.drain(..) {
            worker.join();
        }
    }

    /// Joins the pool and returns the final snapshot
    pub fn wait(&mut self) -> SearchSnapshot {
        self.join();
        self.snapshot()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}
