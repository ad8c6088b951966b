//! The search engine: a pool of scan workers draining a shared queue of
//! directories, each testing file names against one [`Query`].
pub mod engine;
pub mod matcher;
pub mod queue;
pub mod session;
pub mod worker;

pub use engine::search;
pub use matcher::{PatternMatcher, Query};
pub use session::{ScanSettings, SearchSession};
