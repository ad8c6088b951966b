use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{SearchError, SearchResult};
use crate::search::matcher::Query;

/// Thread count used when the hardware parallelism cannot be determined
pub const FALLBACK_THREAD_COUNT: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(n) => n,
    None => unreachable!(),
};

/// Configuration for a search.
///
/// # Configuration Locations
///
/// Loaded from these files, later ones overriding earlier ones:
/// 1. Global `$CONFIG_DIR/fastsearch/config.yaml`
/// 2. Local `.fastsearch.yaml` in the current directory
/// 3. A file passed explicitly (the CLI's `--config` flag)
///
/// Command-line arguments are applied on top with [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Text or regex to look for in file names
/// pattern: "invoice"
///
/// # Directory to walk
/// root_path: "/home/me/documents"
///
/// case_sensitive: false
/// use_regex: false
///
/// # Globs for entries to skip (matched against the leaf name or full path)
/// ignore_patterns:
///   - ".git"
///   - "**/node_modules"
///
/// # Worker threads (default: CPU cores)
/// thread_count: 8
///
/// # How often a busy worker yields its time slice, in milliseconds
/// yield_interval_ms: 1
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Text or regex to look for
    #[serde(default)]
    pub pattern: String,

    /// Root directory to start search from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Compare case exactly
    #[serde(default)]
    pub case_sensitive: bool,

    /// Treat `pattern` as a regular expression matched against file names
    #[serde(default)]
    pub use_regex: bool,

    /// Globs for directories and files to leave out of the walk
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of scan workers.
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Minimum time between voluntary yields of a busy worker
    #[serde(default = "default_yield_interval_ms")]
    pub yield_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Values given on the command line. `None` (or `false`/empty for flags and
/// lists) means "not passed", so the file or default value is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub pattern: Option<String>,
    pub root_path: Option<PathBuf>,
    pub case_sensitive: bool,
    pub use_regex: bool,
    pub ignore_patterns: Vec<String>,
    pub thread_count: Option<NonZeroUsize>,
    pub yield_interval_ms: Option<u64>,
    pub log_level: Option<String>,
}

/// Hardware parallelism, or [`FALLBACK_THREAD_COUNT`] when unknown
pub fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(FALLBACK_THREAD_COUNT)
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_yield_interval_ms() -> u64 {
    1
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            case_sensitive: false,
            use_regex: false,
            ignore_patterns: Vec::new(),
            thread_count: default_thread_count(),
            yield_interval_ms: default_yield_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an optional file.
    /// An explicitly named file must exist.
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            // Global config
            dirs::config_dir().map(|p| p.join("fastsearch/config.yaml")),
            // Local config
            Some(PathBuf::from(".fastsearch.yaml")),
        ];

        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values.
    /// Anything the user actually passed wins, even if it equals a default.
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if cli.case_sensitive {
            self.case_sensitive = true;
        }
        if cli.use_regex {
            self.use_regex = true;
        }
        if !cli.ignore_patterns.is_empty() {
            self.ignore_patterns = cli.ignore_patterns;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(yield_interval_ms) = cli.yield_interval_ms {
            self.yield_interval_ms = yield_interval_ms;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Checks the values a search cannot run without
    pub fn validate(&self) -> SearchResult<()> {
        if self.pattern.is_empty() {
            return Err(SearchError::config_error("No search pattern given"));
        }
        Ok(())
    }

    /// The query this configuration describes
    pub fn query(&self) -> Query {
        Query {
            text: self.pattern.clone(),
            case_sensitive: self.case_sensitive,
            is_regex: self.use_regex,
        }
    }

    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_interval_ms)
    }
}
