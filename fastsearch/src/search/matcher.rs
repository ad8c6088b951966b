use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;

type CompiledRegex = Result<Arc<Regex>, String>;

/// Compiled regexes keyed by (pattern, case sensitive). Failed compilations are
/// cached too so a bad pattern is only reported once.
static REGEX_CACHE: Lazy<DashMap<(String, bool), CompiledRegex>> = Lazy::new(DashMap::new);

/// What to search for. Built once per search and never changed while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Pattern text, either a literal substring or a regex
    pub text: String,
    /// Compare case exactly when true
    pub case_sensitive: bool,
    /// Interpret `text` as a regular expression
    pub is_regex: bool,
}

impl Query {
    /// A case-insensitive literal query
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_sensitive: false,
            is_regex: false,
        }
    }

    /// A case-insensitive regex query
    pub fn regex(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_sensitive: false,
            is_regex: true,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }
}

/// Linear-time substring search (Knuth-Morris-Pratt).
///
/// The failure table is built once from the needle; each search then walks
/// the haystack exactly once, so repetitive names like `aaaa...ab` cannot
/// trigger quadratic backtracking. Works on UTF-8 bytes, which is exact for
/// substring tests between valid strings.
#[derive(Debug, Clone)]
pub struct KmpPattern {
    needle: Vec<u8>,
    failure: Vec<usize>,
}

impl KmpPattern {
    pub fn new(needle: &str) -> Self {
        let needle = needle.as_bytes().to_vec();
        let failure = Self::failure_table(&needle);
        Self { needle, failure }
    }

    /// `failure[i]` is the length of the longest proper prefix of
    /// `needle[..=i]` that is also a suffix of it.
    fn failure_table(needle: &[u8]) -> Vec<usize> {
        let mut failure = vec![0; needle.len()];
        let mut k = 0;
        for i in 1..needle.len() {
            while k > 0 && needle[i] != needle[k] {
                k = failure[k - 1];
            }
            if needle[i] == needle[k] {
                k += 1;
            }
            failure[i] = k;
        }
        failure
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Returns true if the needle occurs anywhere in `haystack`.
    /// An empty needle never matches.
    pub fn find_in(&self, haystack: &[u8]) -> bool {
        if self.needle.is_empty() || haystack.len() < self.needle.len() {
            return false;
        }

        let mut j = 0;
        for &byte in haystack {
            while j > 0 && byte != self.needle[j] {
                j = self.failure[j - 1];
            }
            if byte == self.needle[j] {
                j += 1;
                if j == self.needle.len() {
                    return true;
                }
            }
        }
        false
    }
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    Literal(KmpPattern),
    Regex(Arc<Regex>),
    /// The regex did not compile; nothing matches
    Invalid(String),
}

/// Decides whether a file satisfies a [`Query`]
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    query: Query,
    strategy: MatchStrategy,
}

impl PatternMatcher {
    /// Creates a new PatternMatcher for the given query
    pub fn new(query: Query) -> Self {
        Self::with_metrics(query, &ScanMetrics::new())
    }

    /// Creates a new PatternMatcher, recording regex cache lookups in `metrics`
    pub fn with_metrics(query: Query, metrics: &ScanMetrics) -> Self {
        let strategy = if query.is_regex {
            match Self::compile_regex(&query.text, query.case_sensitive, metrics) {
                Ok(regex) => MatchStrategy::Regex(regex),
                Err(reason) => MatchStrategy::Invalid(reason),
            }
        } else {
            let folded = fold_case(&query.text, query.case_sensitive);
            MatchStrategy::Literal(KmpPattern::new(&folded))
        };

        Self { query, strategy }
    }

    fn compile_regex(pattern: &str, case_sensitive: bool, metrics: &ScanMetrics) -> CompiledRegex {
        let key = (pattern.to_string(), case_sensitive);
        if let Some(entry) = REGEX_CACHE.get(&key) {
            metrics.record_cache_operation(true);
            return entry.clone();
        }

        metrics.record_cache_operation(false);
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map(Arc::new)
            .map_err(|e| {
                warn!(pattern, error = %e, "Invalid regex, search will match nothing");
                e.to_string()
            });

        REGEX_CACHE.insert(key, compiled.clone());
        compiled
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    /// Reports a pattern that can never match: empty text or a regex that
    /// failed to compile. Searching with such a matcher still completes.
    pub fn check(&self) -> SearchResult<()> {
        match &self.strategy {
            MatchStrategy::Invalid(reason) => Err(SearchError::invalid_pattern(format!(
                "{}: {}",
                self.query.text, reason
            ))),
            MatchStrategy::Literal(kmp) if kmp.is_empty() => {
                Err(SearchError::invalid_pattern("empty pattern"))
            }
            _ => Ok(()),
        }
    }

    /// Tests a single candidate string
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Literal(kmp) => {
                let candidate = fold_case(candidate, self.query.case_sensitive);
                kmp.find_in(candidate.as_bytes())
            }
            MatchStrategy::Regex(regex) => regex.is_match(candidate),
            MatchStrategy::Invalid(_) => false,
        }
    }

    /// Tests a file. The leaf name is tried first; literal queries then fall
    /// back to the full path so a directory segment can match. Regex queries
    /// only ever see the leaf name.
    pub fn matches_file(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.matches(&name.to_string_lossy()) {
                return true;
            }
        }

        match self.strategy {
            MatchStrategy::Literal(_) => self.matches(&path.to_string_lossy()),
            _ => false,
        }
    }
}

fn fold_case(text: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.to_lowercase())
    }
}
