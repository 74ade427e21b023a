//! Query types understood by doc set construction.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::bits::{FixedBitSet, copy_range};
use crate::docset::DocSet;
use crate::error::{DocSetError, Result};
use crate::search::{IndexSearcher, SegmentReader};

/// A query that can be evaluated one segment at a time.
pub trait Query: Send + Sync + Debug {
    /// Downcasting hook.
    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn Query>;

    /// Queries that can produce their doc set directly return themselves here.
    fn as_doc_set_producer(&self) -> Option<&dyn DocSetProducer> {
        None
    }

    /// Local doc ids of `segment` that match, deletions ignored.
    ///
    /// The returned bitmap has length `segment.max_doc()`.
    fn segment_matches(&self, segment: &dyn SegmentReader) -> Result<FixedBitSet>;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A query that knows how to build its own doc set.
pub trait DocSetProducer {
    fn create_doc_set(&self, searcher: &dyn IndexSearcher) -> Result<Arc<DocSet>>;
}

/// A field/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Matches documents containing a single term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    term: Term,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        TermQuery {
            term: Term::new(field, text),
        }
    }

    pub fn from_term(term: Term) -> Self {
        TermQuery { term }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl Query for TermQuery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn segment_matches(&self, segment: &dyn SegmentReader) -> Result<FixedBitSet> {
        let max_doc = segment.max_doc();
        let mut bits = FixedBitSet::new(max_doc);
        if let Some(mut postings) = segment.postings(&self.term)? {
            while let Some(doc) = postings.next_doc()? {
                if doc as usize >= max_doc {
                    return Err(DocSetError::internal(format!(
                        "posting {doc} beyond segment max_doc {max_doc}"
                    )));
                }
                bits.set(doc as usize);
            }
        }
        Ok(bits)
    }
}

/// Matches every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAllQuery;

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery
    }
}

impl Query for MatchAllQuery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(*self)
    }

    fn segment_matches(&self, segment: &dyn SegmentReader) -> Result<FixedBitSet> {
        let mut bits = FixedBitSet::new(segment.max_doc());
        bits.set_range(0, segment.max_doc());
        Ok(bits)
    }
}

/// Matches the members of a precomputed doc set.
#[derive(Debug, Clone)]
pub struct DocSetQuery {
    docs: Arc<DocSet>,
}

impl DocSetQuery {
    pub fn new(docs: Arc<DocSet>) -> Self {
        DocSetQuery { docs }
    }

    pub fn doc_set(&self) -> &Arc<DocSet> {
        &self.docs
    }
}

impl DocSetProducer for DocSetQuery {
    fn create_doc_set(&self, _searcher: &dyn IndexSearcher) -> Result<Arc<DocSet>> {
        Ok(Arc::clone(&self.docs))
    }
}

impl Query for DocSetQuery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_doc_set_producer(&self) -> Option<&dyn DocSetProducer> {
        Some(self)
    }

    fn segment_matches(&self, segment: &dyn SegmentReader) -> Result<FixedBitSet> {
        let base = segment.doc_base() as usize;
        let end = segment.doc_end();
        let mut bits = FixedBitSet::new(segment.max_doc());

        match self.docs.as_ref() {
            DocSet::Empty => {}
            DocSet::Bits(set) => {
                let limit = end.min(set.max_doc());
                if base < limit {
                    copy_range(set.bits(), base, limit, &mut bits, 0)?;
                }
            }
            DocSet::Sorted(set) => {
                let docs = set.docs();
                let start = docs.partition_point(|&doc| (doc as usize) < base);
                for &doc in docs[start..].iter().take_while(|&&doc| (doc as usize) < end) {
                    bits.set(doc as usize - base);
                }
            }
        }
        Ok(bits)
    }
}

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// At least one should clause must match when there are no required clauses.
    Should,
    /// The clause must not match.
    MustNot,
    /// The clause must match; used for filters.
    Filter,
}

/// A clause in a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    pub query: Box<dyn Query>,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }
}

/// Combines queries with boolean logic.
#[derive(Debug, Clone, Default)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::new(query, Occur::Must));
    }

    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::new(query, Occur::Should));
    }

    pub fn add_must_not(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::new(query, Occur::MustNot));
    }

    pub fn add_filter(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::new(query, Occur::Filter));
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl Query for BooleanQuery {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn segment_matches(&self, segment: &dyn SegmentReader) -> Result<FixedBitSet> {
        let max_doc = segment.max_doc();
        let mut required: Option<FixedBitSet> = None;
        let mut optional: Option<FixedBitSet> = None;
        let mut excluded: Vec<FixedBitSet> = Vec::new();

        for clause in &self.clauses {
            let matches = clause.query.segment_matches(segment)?;
            match clause.occur {
                Occur::Must | Occur::Filter => match required.as_mut() {
                    Some(bits) => bits.and(&matches),
                    None => required = Some(matches),
                },
                Occur::Should => match optional.as_mut() {
                    Some(bits) => bits.or(&matches),
                    None => optional = Some(matches),
                },
                Occur::MustNot => excluded.push(matches),
            }
        }

        let mut result = match (required, optional) {
            (Some(bits), _) => bits,
            (None, Some(bits)) => bits,
            (None, None) if !excluded.is_empty() => {
                let mut all = FixedBitSet::new(max_doc);
                all.set_range(0, max_doc);
                all
            }
            (None, None) => FixedBitSet::new(max_doc),
        };
        for bits in &excluded {
            result.and_not(bits);
        }
        Ok(result)
    }
}

/// Restrict `query` to the members of `filter`.
///
/// A match-all query collapses to the filter itself.
pub fn combine_query_and_filter(query: &dyn Query, filter: Arc<DocSet>) -> Box<dyn Query> {
    let filter_query = filter.to_query();
    if query.as_any().is::<MatchAllQuery>() {
        return Box::new(filter_query);
    }

    let mut combined = BooleanQuery::new();
    combined.add_must(query.clone_box());
    combined.add_filter(Box::new(filter_query));
    Box::new(combined)
}
