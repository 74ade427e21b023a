//! Contract with the query execution layer.
//!
//! Doc set construction does not read index files or plan queries itself.
//! It drives the traits below, which the host searcher implements:
//!
//! - [`IndexSearcher`]: a point-in-time view over all segments
//! - [`SegmentReader`]: one segment with its doc base, liveness and postings
//! - [`Postings`]: a forward-only posting list cursor
//! - [`Collector`]: the sink that general query evaluation pushes matches into

pub mod query;

use std::fmt::Debug;
use std::sync::Arc;

use crate::DocId;
use crate::bits::Bits;
use crate::docset::DocSet;
use crate::error::Result;

pub use query::{
    BooleanClause, BooleanQuery, DocSetProducer, DocSetQuery, MatchAllQuery, Occur, Query, Term,
    TermQuery, combine_query_and_filter,
};

/// A forward-only cursor over the segment-local doc ids of one term.
pub trait Postings {
    /// Number of documents containing the term, deletions included.
    fn doc_freq(&self) -> usize;

    /// Advance to the next doc id, or `None` once exhausted.
    ///
    /// Doc ids are returned in ascending order. Implementations may fail with
    /// `ResourceExhausted` when the query budget runs out.
    fn next_doc(&mut self) -> Result<Option<DocId>>;
}

/// One segment of the index.
pub trait SegmentReader: Send + Sync + Debug {
    /// Global doc id of this segment's local doc 0.
    fn doc_base(&self) -> DocId;

    /// Number of local doc ids, deleted ones included.
    fn max_doc(&self) -> usize;

    /// Liveness bitmap over local doc ids, or `None` if nothing is deleted.
    fn live_docs(&self) -> Option<&dyn Bits>;

    /// Postings for `term`, or `None` if the field or term is absent here.
    fn postings(&self, term: &Term) -> Result<Option<Box<dyn Postings + '_>>>;

    /// Exclusive upper bound of this segment in global doc ids.
    fn doc_end(&self) -> usize {
        self.doc_base() as usize + self.max_doc()
    }

    /// Number of documents not marked deleted.
    fn num_live_docs(&self) -> usize {
        match self.live_docs() {
            None => self.max_doc(),
            Some(live) => (0..self.max_doc()).filter(|&doc| live.get(doc)).count(),
        }
    }

    /// Returns true if `local_doc` is not deleted.
    fn is_live(&self, local_doc: DocId) -> bool {
        self.live_docs().is_none_or(|live| live.get(local_doc as usize))
    }
}

/// A point-in-time searcher over a multi-segment index.
pub trait IndexSearcher: Send + Sync {
    /// Exclusive upper bound on doc ids.
    fn max_doc(&self) -> usize;

    /// Number of live documents.
    fn num_docs(&self) -> usize;

    /// The segments of this snapshot.
    fn segments(&self) -> &[Arc<dyn SegmentReader>];

    /// The canonical set of all live documents.
    fn live_doc_set(&self) -> Result<Arc<DocSet>>;

    /// Offer `candidate`, which has `size == num_docs()` members, as the live
    /// doc set. Returns the canonical instance, which may be `candidate`.
    ///
    /// A candidate holding any deleted or out-of-range doc is returned
    /// unchanged and never cached.
    fn offer_live_docs(&self, candidate: Arc<DocSet>, size: usize) -> Arc<DocSet>;

    /// Evaluate `query`, pushing every live match into `collector`.
    fn search(&self, query: &dyn Query, collector: &mut dyn Collector) -> Result<()>;
}

/// Receives matches segment by segment during query evaluation.
pub trait Collector {
    /// Called before any doc of `segment` is collected.
    fn set_segment(&mut self, segment: &dyn SegmentReader) -> Result<()>;

    /// Collect a segment-local doc id of the current segment.
    fn collect(&mut self, doc: DocId) -> Result<()>;

    /// Called when evaluation stops before visiting every match.
    fn abort(&mut self, _reason: &str) {}
}
