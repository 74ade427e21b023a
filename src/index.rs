//! Index implementations of the search contract.

pub mod memory;

pub use memory::{MemoryIndexSearcher, MemorySegment};
