use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Live counters shared by every worker of a search run.
///
/// All counters are lock-free and only ever grow during a run. Reads are
/// point-in-time and are not linearised with the result list, so a reader may
/// see `matches_found` slightly ahead of the matching path becoming visible.
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    // Traversal metrics
    files_processed: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,
    dirs_scanned: Arc<AtomicU64>,

    // Regex cache metrics
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance with every counter at zero
    pub fn new() -> Self {
        Self {
            files_processed: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
            dirs_scanned: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one non-directory entry tested against the query
    pub fn record_file(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one matching file
    pub fn record_match(&self) {
        self.matches_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a directory whose listing was opened
    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a regex cache lookup
    pub fn record_cache_operation(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed.load(Ordering::Relaxed)
    }

    pub fn matches_found(&self) -> u64 {
        self.matches_found.load(Ordering::Relaxed)
    }

    pub fn dirs_scanned(&self) -> u64 {
        self.dirs_scanned.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a point-in-time copy of every counter
    pub fn stats(&self) -> ScanStats {
        ScanStats {
            files_processed: self.files_processed(),
            matches_found: self.matches_found(),
            dirs_scanned: self.dirs_scanned(),
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            "Scan stats:\n\
             Files processed: {}\n\
             Matches found: {}\n\
             Directories scanned: {}\n\
             Regex cache hits/misses: {}/{}",
            stats.files_processed,
            stats.matches_found,
            stats.dirs_scanned,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the scan counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_processed: u64,
    pub matches_found: u64,
    pub dirs_scanned: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
