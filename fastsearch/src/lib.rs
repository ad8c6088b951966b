pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{ConfigOverrides, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use results::SearchSnapshot;
pub use search::{search, PatternMatcher, Query, ScanSettings, SearchSession};
