use tracing::debug;

use super::session::SearchSession;
use crate::config::SearchConfig;
use crate::errors::SearchResult;
use crate::results::SearchSnapshot;

/// Runs a search to completion on the calling thread's behalf.
///
/// Same engine as [`SearchSession`], for callers that do not need live
/// progress. A config without a pattern is rejected up front.
pub fn search(config: &SearchConfig) -> SearchResult<SearchSnapshot> {
    config.validate()?;

    let mut session = SearchSession::with_config(config);
    session.start(config.query(), &config.root_path)?;
    let snapshot = session.wait();

    debug!(
        files = snapshot.files_processed,
        matches = snapshot.matches_found,
        "Blocking search finished"
    );
    Ok(snapshot)
}
