use anyhow::Result;
use fastsearch::{search, Query, ScanSettings, SearchConfig, SearchSession};
use std::collections::HashSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn create_tree(root: &Path, dirs: usize, files_per_dir: usize) -> Result<usize> {
    for d in 0..dirs {
        // Nest every fourth directory one level deeper
        let dir = if d % 4 == 0 {
            root.join(format!("group_{}", d)).join("nested")
        } else {
            root.join(format!("group_{}", d))
        };
        fs::create_dir_all(&dir)?;
        for f in 0..files_per_dir {
            fs::write(dir.join(format!("file_{}_{}.dat", d, f)), "")?;
        }
    }
    Ok(dirs * files_per_dir)
}

fn session(threads: usize) -> SearchSession {
    SearchSession::with_settings(ScanSettings {
        thread_count: NonZeroUsize::new(threads).unwrap(),
        ..Default::default()
    })
}

fn wait_until_stopped(session: &SearchSession, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while session.is_running() {
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

#[test]
fn test_counts_every_file_exactly_once() -> Result<()> {
    let dir = tempdir()?;
    let expected = create_tree(dir.path(), 100, 100)?;

    let mut session = session(8);
    session.start(Query::literal(".dat"), dir.path())?;
    let snapshot = session.wait();

    assert!(!snapshot.running);
    assert_eq!(snapshot.files_processed, expected as u64);
    assert_eq!(snapshot.matches_found, expected as u64);
    assert_eq!(snapshot.results.len(), expected);

    let unique: HashSet<_> = snapshot.results.iter().collect();
    assert_eq!(unique.len(), expected, "a file was recorded twice");
    Ok(())
}

#[test]
fn test_results_are_files_under_root() -> Result<()> {
    let dir = tempdir()?;
    create_tree(dir.path(), 12, 5)?;
    // Directory names match the query too, but only files may be reported
    fs::create_dir(dir.path().join("file_dir_decoy"))?;

    let mut session = session(4);
    session.start(Query::literal("file_"), dir.path())?;
    let snapshot = session.wait();

    assert_eq!(snapshot.results.len(), 60);
    for path in &snapshot.results {
        assert!(path.starts_with(dir.path()), "{} is outside root", path.display());
        assert!(path.is_file(), "{} is not a file", path.display());
    }
    Ok(())
}

#[test]
fn test_same_query_twice_gives_same_set() -> Result<()> {
    let dir = tempdir()?;
    create_tree(dir.path(), 40, 25)?;

    let mut session = session(4);
    session.start(Query::regex(r"_[13]\.dat$"), dir.path())?;
    let first: HashSet<PathBuf> = session.wait().results.into_iter().collect();

    session.start(Query::regex(r"_[13]\.dat$"), dir.path())?;
    let second: HashSet<PathBuf> = session.wait().results.into_iter().collect();

    assert_eq!(first.len(), 80);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_empty_literal_pattern_matches_nothing() -> Result<()> {
    let dir = tempdir()?;
    let expected = create_tree(dir.path(), 5, 10)?;

    let mut session = session(2);
    session.start(Query::literal(""), dir.path())?;
    let snapshot = session.wait();

    assert_eq!(snapshot.files_processed, expected as u64);
    assert_eq!(snapshot.matches_found, 0);
    assert!(snapshot.results.is_empty());
    Ok(())
}

#[test]
fn test_case_sensitivity() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("Foo.txt"), "")?;
    fs::write(dir.path().join("foo.txt"), "")?;
    fs::write(dir.path().join("bar.txt"), "")?;

    let mut session = session(2);
    session.start(Query::literal("foo."), dir.path())?;
    let insensitive: HashSet<PathBuf> = session.wait().results.into_iter().collect();
    assert_eq!(
        insensitive,
        HashSet::from([dir.path().join("Foo.txt"), dir.path().join("foo.txt")])
    );

    session.start(Query::literal("foo.").case_sensitive(true), dir.path())?;
    let sensitive = session.wait().results;
    assert_eq!(sensitive, vec![dir.path().join("foo.txt")]);
    Ok(())
}

#[test]
fn test_invalid_regex_completes_with_no_matches() -> Result<()> {
    let dir = tempdir()?;
    let expected = create_tree(dir.path(), 5, 5)?;
    fs::write(dir.path().join("[abc"), "")?;

    let mut session = session(2);
    session.start(Query::regex("[abc"), dir.path())?;
    assert!(wait_until_stopped(&session, Duration::from_secs(10)));

    let snapshot = session.snapshot();
    assert!(!snapshot.running);
    assert_eq!(snapshot.files_processed, expected as u64 + 1);
    assert_eq!(snapshot.matches_found, 0);
    Ok(())
}

#[test]
fn test_literal_matches_directory_segment_but_regex_does_not() -> Result<()> {
    let dir = tempdir()?;
    let reports = dir.path().join("quarterly_reports");
    fs::create_dir(&reports)?;
    fs::write(reports.join("q1.csv"), "")?;
    fs::write(reports.join("q2.csv"), "")?;
    fs::write(dir.path().join("summary.csv"), "")?;

    let mut session = session(2);
    session.start(Query::literal("quarterly_reports"), dir.path())?;
    assert_eq!(session.wait().results.len(), 2);

    session.start(Query::regex("quarterly_reports"), dir.path())?;
    assert!(session.wait().results.is_empty());
    Ok(())
}

#[test]
fn test_progress_is_monotonic_while_polling() -> Result<()> {
    let dir = tempdir()?;
    let expected = create_tree(dir.path(), 60, 50)?;

    let mut session = session(4);
    session.start(Query::literal("_7"), dir.path())?;

    let mut last = 0;
    let mut seen = Vec::new();
    loop {
        let running = session.is_running();
        let snapshot = session.snapshot();
        assert!(snapshot.files_processed >= last, "files_processed went backwards");
        last = snapshot.files_processed;
        seen.extend(session.results_since(seen.len()));
        if !running {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }

    let final_snapshot = session.wait();
    assert_eq!(final_snapshot.files_processed, expected as u64);
    seen.extend(session.results_since(seen.len()));
    assert_eq!(seen, final_snapshot.results);

    // Nothing changes after completion
    thread::sleep(Duration::from_millis(20));
    assert_eq!(session.files_processed(), expected as u64);
    Ok(())
}

#[test]
fn test_cancel_stops_quickly() -> Result<()> {
    let dir = tempdir()?;
    let total = create_tree(dir.path(), 200, 60)?;

    let mut session = session(2);
    session.start(Query::literal("file"), dir.path())?;
    session.cancel();
    assert!(session.is_cancelled());
    assert!(wait_until_stopped(&session, Duration::from_secs(5)));

    let stopped_at = session.files_processed();
    assert!(stopped_at <= total as u64);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(session.files_processed(), stopped_at);

    session.join();
    assert_eq!(session.files_processed(), stopped_at);
    assert!(session.snapshot().results.len() as u64 <= stopped_at);
    Ok(())
}

#[test]
fn test_cancel_mid_directory_leaves_work_undone() -> Result<()> {
    let dir = tempdir()?;
    let flat = dir.path().join("flat");
    fs::create_dir(&flat)?;
    let total = 30_000u64;
    for i in 0..total {
        fs::write(flat.join(format!("entry_{}.dat", i)), "")?;
    }

    let mut session = session(1);
    session.start(Query::literal("entry_"), dir.path())?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while session.files_processed() == 0 && session.is_running() && Instant::now() < deadline {
        thread::yield_now();
    }
    session.cancel();
    assert!(wait_until_stopped(&session, Duration::from_secs(5)));

    let stopped_at = session.files_processed();
    assert!(stopped_at > 0);
    assert!(
        stopped_at < total,
        "cancelled search still processed all {} files",
        total
    );

    let results_at_stop = session.snapshot().results.len();
    thread::sleep(Duration::from_millis(50));
    session.join();
    assert_eq!(session.files_processed(), stopped_at);
    assert_eq!(session.snapshot().results.len(), results_at_stop);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_directory_symlink_is_not_reported_as_file() -> Result<()> {
    let dir = tempdir()?;
    let real = dir.path().join("real_photos");
    fs::create_dir(&real)?;
    fs::write(real.join("a.jpg"), "")?;
    std::os::unix::fs::symlink(&real, dir.path().join("photos_link"))?;
    std::os::unix::fs::symlink(real.join("a.jpg"), dir.path().join("photos_file_link"))?;

    let mut session = session(2);
    session.start(Query::literal("photos"), dir.path())?;
    let snapshot = session.wait();

    // The directory link is neither followed nor counted
    assert_eq!(snapshot.files_processed, 2);
    let results: HashSet<PathBuf> = snapshot.results.into_iter().collect();
    assert_eq!(
        results,
        HashSet::from([real.join("a.jpg"), dir.path().join("photos_file_link")])
    );
    for path in &results {
        assert!(!path.is_dir(), "{} is a directory", path.display());
    }
    Ok(())
}

#[test]
fn test_drop_cancels_running_search() -> Result<()> {
    let dir = tempdir()?;
    create_tree(dir.path(), 100, 50)?;

    let started = Instant::now();
    {
        let mut session = session(2);
        session.start(Query::literal("file"), dir.path())?;
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[test]
fn test_blocking_search_from_config() -> Result<()> {
    let dir = tempdir()?;
    create_tree(dir.path(), 8, 8)?;
    fs::create_dir(dir.path().join("group_1").join("skip"))?;
    fs::write(dir.path().join("group_1").join("skip").join("file_x.dat"), "")?;

    let config = SearchConfig {
        pattern: "file_1_".to_string(),
        root_path: dir.path().to_path_buf(),
        ignore_patterns: vec!["skip".to_string()],
        thread_count: NonZeroUsize::new(3).unwrap(),
        ..Default::default()
    };

    let result = search(&config)?;
    assert_eq!(result.files_processed, 64);
    assert_eq!(result.matches_found, 8);
    Ok(())
}
