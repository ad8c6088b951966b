use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors surfaced to callers of the search engine.
///
/// Failures that happen inside a running search (an unreadable directory, a
/// regex that does not compile) are recovered by the workers and never show
/// up here. These variants cover what the caller can actually act on.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
    #[error("Failed to spawn scan worker {id}: {source}")]
    WorkerSpawn {
        id: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Root path does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SearchError {
    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn worker_spawn(id: usize, source: std::io::Error) -> Self {
        Self::WorkerSpawn { id, source }
    }

    pub fn root_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RootNotFound(path.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SearchError::invalid_pattern("[abc");
        assert!(matches!(err, SearchError::InvalidPattern(_)));

        let err = SearchError::config_error("bad thread count");
        assert!(matches!(err, SearchError::ConfigError(_)));

        let err = SearchError::worker_spawn(3, std::io::Error::other("no threads"));
        assert!(matches!(err, SearchError::WorkerSpawn { id: 3, .. }));

        let err = SearchError::root_not_found("missing");
        assert!(matches!(err, SearchError::RootNotFound(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::invalid_pattern("Invalid regex: unclosed character class");
        assert_eq!(
            err.to_string(),
            "Invalid pattern: Invalid regex: unclosed character class"
        );

        let err = SearchError::config_error("Missing required field".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = SearchError::worker_spawn(1, std::io::Error::other("limit reached"));
        assert_eq!(
            err.to_string(),
            "Failed to spawn scan worker 1: limit reached"
        );

        let err = SearchError::root_not_found("nowhere");
        assert_eq!(err.to_string(), "Root path does not exist: nowhere");
    }
}
