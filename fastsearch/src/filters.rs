use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::warn;

/// Glob patterns that prune entries from a walk.
///
/// A pattern is tried against the entry's full path (with `/` separators) and
/// against its leaf name, so both `**/node_modules` and `*.tmp` do what one
/// expects. Ignored directories are never enqueued; ignored files are neither
/// counted nor matched.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    /// Compiles the given globs. Malformed globs are logged and skipped.
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(pattern = %raw, error = %e, "Skipping invalid ignore pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks if an entry should be skipped
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let normalized_path = path.to_string_lossy().replace('\\', "/");
        let name = path.file_name().map(|n| n.to_string_lossy());

        self.patterns.iter().any(|p| {
            p.matches_with(&normalized_path, options)
                || name
                    .as_deref()
                    .is_some_and(|n| p.matches_with(n, options))
        })
    }
}
