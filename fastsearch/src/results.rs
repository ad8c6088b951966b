use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::SearchResult;

/// Point-in-time view of a search, cheap enough to take once per frame.
///
/// The counters and the result list are read separately, so `matches_found`
/// may briefly disagree with `results.len()` while workers are still running.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchSnapshot {
    /// Non-directory entries tested against the query
    pub files_processed: u64,
    /// Entries that matched
    pub matches_found: u64,
    /// Directories whose listing was opened
    pub dirs_scanned: u64,
    /// Directories discovered but not yet listed
    pub queue_depth: usize,
    /// False once every worker has drained
    pub running: bool,
    /// Time since start, frozen at completion
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    /// Matching file paths in the order they were found
    pub results: Vec<PathBuf>,
}

fn as_secs_f64<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl SearchSnapshot {
    /// Rough completion ratio for a progress bar.
    ///
    /// Compares directories already listed with directories still queued.
    /// Queued directories hide an unknown number of descendants, so this
    /// overestimates early on; it is capped below 1.0 until the run ends.
    pub fn estimated_progress(&self) -> f32 {
        if !self.running {
            return 1.0;
        }
        let done = self.dirs_scanned as f64;
        let total = done + self.queue_depth as f64;
        if total == 0.0 {
            return 0.0;
        }
        ((done / total) as f32).min(0.99)
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files_processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Serializes the snapshot as pretty-printed JSON
    pub fn to_json(&self) -> SearchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
