//! Core indexing-and-search engine: a positional inverted index guarded by
//! a purpose-built reader-writer lock, a partitioned build pipeline that
//! merges per-task local indexes into the shared index, ranked search over
//! exact or prefix-matched stems, and a bounded concurrent web crawl that
//! feeds the index from a seed URL.

pub mod build;
pub mod crawl;
pub mod error;
pub mod html;
pub mod index;
pub mod json;
pub mod rwlock;
pub mod search;
pub mod token;
pub mod workqueue;

pub use build::FileBuilder;
pub use crawl::Crawler;
pub use error::{EngineError, Result};
pub use index::facade::SharedIndex;
pub use index::{InvertedIndex, SearchResult};
pub use search::SearchBuilder;
pub use workqueue::WorkQueue;
