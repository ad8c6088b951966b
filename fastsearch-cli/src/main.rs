use clap::Parser;
use colored::Colorize;
use fastsearch::{ConfigOverrides, SearchConfig, SearchError, SearchSession, SearchSnapshot};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

/// How often the progress line is refreshed (~60 FPS)
const UPDATE_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(author, version, about = "Search a directory tree for file names", long_about = None)]
struct Cli {
    /// Text to look for in file names (or a regex with --regex)
    #[arg(short = 'p', long)]
    pattern: Option<String>,

    /// Root directory to search in [default: .]
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Match case exactly
    #[arg(short = 'c', long)]
    case_sensitive: bool,

    /// Treat the pattern as a regular expression (matched against file names only)
    #[arg(short = 'r', long)]
    regex: bool,

    /// Globs for directories or files to skip
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Configuration file to load on top of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop the search after this long (e.g. "500ms", "2m")
    #[arg(long, value_parser = humantime::parse_duration)]
    max_time: Option<Duration>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(short, long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            pattern: self.pattern.clone(),
            root_path: self.root.clone(),
            case_sensitive: self.case_sensitive,
            use_regex: self.regex,
            ignore_patterns: self.ignore.clone(),
            thread_count: self.threads,
            yield_interval_ms: None,
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = SearchConfig::load_from(cli.config.as_deref())?.merge_with_cli(cli.overrides());
    init_logging(&config.log_level);
    config.validate()?;

    if !config.root_path.is_dir() {
        return Err(SearchError::root_not_found(&config.root_path));
    }

    let query = config.query();
    if let Err(e) = fastsearch::PatternMatcher::new(query.clone()).check() {
        warn!("{}; the search will not match anything", e);
    }

    let mut session = SearchSession::with_config(&config);
    session.start(query, &config.root_path)?;

    let progress = progress_bar(cli.json);
    while session.is_running() {
        // Counters only; results are copied once, after the run
        let stats = session.stats();
        let elapsed = session.elapsed();
        let rate = if elapsed.is_zero() {
            0.0
        } else {
            stats.files_processed as f64 / elapsed.as_secs_f64()
        };
        progress.set_message(format!(
            "Processed: {} files | Found: {} matches | Queue: {} | {:.0} files/s",
            stats.files_processed,
            stats.matches_found,
            session.queue_depth(),
            rate
        ));

        if let Some(limit) = cli.max_time {
            if !session.is_cancelled() && elapsed >= limit {
                debug!(?limit, "Time limit reached, cancelling search");
                session.cancel();
            }
        }
        thread::sleep(UPDATE_INTERVAL);
    }
    progress.finish_and_clear();

    let snapshot = session.wait();
    if cli.json {
        println!("{}", snapshot.to_json()?);
    } else {
        print_search_results(&snapshot, cli.stats, session.is_cancelled());
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_search_results(snapshot: &SearchSnapshot, stats_only: bool, cancelled: bool) {
    if !stats_only {
        for path in &snapshot.results {
            println!("{}", path.display().to_string().blue());
        }
        if !snapshot.results.is_empty() {
            println!();
        }
    }

    let summary = format!(
        "Processed {} files | Found {} matches in {:.2}s",
        snapshot.files_processed,
        snapshot.matches_found,
        snapshot.elapsed.as_secs_f64()
    );
    if cancelled {
        println!("{} {}", summary, "(cancelled)".yellow());
    } else {
        println!("{}", summary.green());
    }
}
