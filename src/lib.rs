//! # Iris DocSet
//!
//! Document sets for filtering and faceting in the Iris search engine.
//!
//! ## Features
//!
//! - Sorted-array and bitmap doc sets behind one [`DocSet`] type
//! - Adaptive construction from term postings or arbitrary queries
//! - Canonicalization against the searcher's live doc set
//! - Run-based bit range copy for merging per-segment liveness
//! - Set algebra for cached filters
// Core modules
pub mod bits;
pub mod builder;
pub mod collector;
pub mod config;
pub mod docset;
mod error;
pub mod index;
pub mod search;

/// A global document ordinal.
pub type DocId = u32;

// Re-exports for the public API
pub use bits::{Bits, FixedBitSet, copy_range};
pub use builder::{DocSetBuilder, collect_sorted_doc_set};
pub use collector::DocSetCollector;
pub use config::{DocSetConfig, small_set_size};
pub use docset::{BitDocSet, DocIter, DocSet, SortedDocSet, docs_equal};
pub use error::{DocSetError, Result};
pub use index::{MemoryIndexSearcher, MemorySegment};
pub use search::{
    BooleanQuery, Collector, DocSetProducer, DocSetQuery, IndexSearcher, MatchAllQuery, Occur,
    Postings, Query, SegmentReader, Term, TermQuery,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
