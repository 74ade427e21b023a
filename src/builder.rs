//! Doc set construction from queries.
//!
//! [`DocSetBuilder`] turns a query into a [`DocSet`], picking the cheapest
//! representation for the result size:
//!
//! 1. queries that produce their own doc set are asked for it,
//! 2. single term queries walk the term's postings segment by segment,
//! 3. match-all queries reuse the searcher's live doc set,
//! 4. anything else is evaluated through a [`DocSetCollector`].
//!
//! Every result is canonicalized: a set with as many members as there are
//! live documents is swapped for the searcher's shared live doc set.

use std::sync::Arc;

use log::{debug, trace};

use crate::DocId;
use crate::bits::FixedBitSet;
use crate::collector::DocSetCollector;
use crate::config::DocSetConfig;
use crate::docset::{BitDocSet, DocSet, SortedDocSet};
use crate::error::{DocSetError, Result};
use crate::search::{
    Collector, IndexSearcher, MatchAllQuery, Postings, Query, SegmentReader, Term, TermQuery,
    combine_query_and_filter,
};

/// Builds doc sets against one searcher.
pub struct DocSetBuilder<'a> {
    searcher: &'a dyn IndexSearcher,
    config: DocSetConfig,
}

struct SegmentPostings<'s> {
    segment: &'s dyn SegmentReader,
    postings: Box<dyn Postings + 's>,
}

impl<'a> DocSetBuilder<'a> {
    pub fn new(searcher: &'a dyn IndexSearcher) -> Self {
        DocSetBuilder {
            searcher,
            config: DocSetConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DocSetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DocSetConfig {
        &self.config
    }

    /// Small set size for the searcher's index.
    pub fn small_set_size(&self) -> usize {
        self.config.small_set_size(self.searcher.max_doc())
    }

    /// Build the doc set matching `query`, restricted to `filter` if given.
    ///
    /// The returned set may be shared with the searcher and must not be
    /// modified. A [`DocSetProducer`](crate::search::DocSetProducer) must not
    /// call this with itself as the query.
    pub fn build_from_query(
        &self,
        query: &dyn Query,
        filter: Option<Arc<DocSet>>,
    ) -> Result<Arc<DocSet>> {
        let combined;
        let query = match filter {
            Some(filter) => {
                combined = combine_query_and_filter(query, filter);
                combined.as_ref()
            }
            None => query,
        };

        if let Some(producer) = query.as_doc_set_producer() {
            let docs = producer.create_doc_set(self.searcher)?;
            return Ok(self.canonicalize(docs));
        }
        if let Some(term_query) = query.as_any().downcast_ref::<TermQuery>() {
            return self.build_for_term(term_query.term());
        }
        if query.as_any().is::<MatchAllQuery>() {
            let live = self.searcher.live_doc_set()?;
            return Ok(self.canonicalize(live));
        }
        self.build_generic(query)
    }

    /// Evaluate `query` through a collector.
    ///
    /// Errors raised during evaluation, such as an exhausted time budget, are
    /// returned as-is; the partially filled collector is discarded.
    pub fn build_generic(&self, query: &dyn Query) -> Result<Arc<DocSet>> {
        let mut collector = DocSetCollector::with_config(self.searcher.max_doc(), &self.config)?;
        self.searcher.search(query, &mut collector)?;
        let docs = collector.into_doc_set()?;
        Ok(self.canonicalize(docs))
    }

    /// Build the doc set of all live documents containing `term`.
    pub fn build_for_term(&self, term: &Term) -> Result<Arc<DocSet>> {
        let max_doc = self.searcher.max_doc();
        let small_set_size = self.config.small_set_size(max_doc);

        let mut segments: Vec<&dyn SegmentReader> = self
            .searcher
            .segments()
            .iter()
            .map(|segment| segment.as_ref())
            .collect();
        segments.sort_by_key(|segment| segment.doc_base());

        let mut max_count = 0usize;
        let mut lists = Vec::with_capacity(segments.len());
        for segment in segments {
            let Some(postings) = segment.postings(term)? else {
                trace!(
                    "segment at {} has no postings for {}:{}",
                    segment.doc_base(),
                    term.field(),
                    term.text()
                );
                continue;
            };
            let doc_freq = postings.doc_freq();
            if doc_freq == 0 {
                continue;
            }
            max_count += doc_freq;
            lists.push(SegmentPostings { segment, postings });
        }

        let docs = if max_count == 0 {
            DocSet::empty()
        } else if max_count <= small_set_size {
            debug!(
                "term {}:{} builds a sorted set for up to {max_count} docs",
                term.field(),
                term.text()
            );
            small_set(lists, max_count, max_doc)?
        } else {
            debug!(
                "term {}:{} builds a bitmap for up to {max_count} docs",
                term.field(),
                term.text()
            );
            self.big_set(lists, max_doc, small_set_size)?
        };
        Ok(self.canonicalize(docs))
    }

    fn big_set(
        &self,
        lists: Vec<SegmentPostings<'_>>,
        max_doc: usize,
        small_set_size: usize,
    ) -> Result<Arc<DocSet>> {
        let mut bits = FixedBitSet::new(max_doc);
        let mut size = 0usize;
        visit_live_docs(lists, max_doc, |doc| {
            bits.set(doc as usize);
            size += 1;
            Ok(())
        })?;

        if size == 0 {
            return Ok(DocSet::empty());
        }
        let set = BitDocSet::new(bits, size);
        if self.config.shrink_sparse_bitmaps && size < small_set_size {
            debug!("deletions left {size} docs, converting bitmap to sorted set");
            return Ok(Arc::new(DocSet::Sorted(set.to_small_set())));
        }
        Ok(Arc::new(DocSet::Bits(set)))
    }

    /// Swap `docs` for the searcher's live doc set when they have the same
    /// size.
    ///
    /// The returned instance is whatever the searcher hands back, which may
    /// be `docs` itself.
    pub fn canonicalize(&self, docs: Arc<DocSet>) -> Arc<DocSet> {
        let size = docs.size();
        if size == self.searcher.num_docs() {
            trace!("offering doc set of size {size} as live docs");
            return self.searcher.offer_live_docs(docs, size);
        }
        docs
    }

    /// Replay `docs` into `collector` segment by segment.
    pub fn collect_sorted(&self, docs: &DocSet, collector: &mut dyn Collector) -> Result<()> {
        collect_sorted_doc_set(docs, self.searcher.segments(), collector)
    }
}

fn small_set(
    lists: Vec<SegmentPostings<'_>>,
    max_possible: usize,
    max_doc: usize,
) -> Result<Arc<DocSet>> {
    let mut docs: Vec<DocId> = Vec::with_capacity(max_possible);
    visit_live_docs(lists, max_doc, |doc| {
        if docs.len() == max_possible {
            return Err(DocSetError::internal(format!(
                "postings returned more than the {max_possible} docs their doc_freq promised"
            )));
        }
        docs.push(doc);
        Ok(())
    })?;

    let len = docs.len();
    if len == 0 {
        return Ok(DocSet::empty());
    }
    Ok(Arc::new(DocSet::Sorted(SortedDocSet::new(docs, len))))
}

/// Walk every posting list in segment order, skipping deleted docs and
/// passing global doc ids to `visit` in strictly ascending order.
fn visit_live_docs<F>(lists: Vec<SegmentPostings<'_>>, max_doc: usize, mut visit: F) -> Result<()>
where
    F: FnMut(DocId) -> Result<()>,
{
    let mut last: Option<usize> = None;
    for SegmentPostings {
        segment,
        mut postings,
    } in lists
    {
        let base = segment.doc_base() as usize;
        let segment_max_doc = segment.max_doc();
        let live = segment.live_docs();

        while let Some(local) = postings.next_doc()? {
            let local = local as usize;
            if local >= segment_max_doc {
                return Err(DocSetError::internal(format!(
                    "posting {local} beyond segment max_doc {segment_max_doc}"
                )));
            }
            if let Some(live) = live
                && !live.get(local)
            {
                continue;
            }

            let global = base + local;
            if global >= max_doc {
                return Err(DocSetError::internal(format!(
                    "doc {global} mapped beyond max_doc {max_doc}"
                )));
            }
            if last.is_some_and(|prev| global <= prev) {
                return Err(DocSetError::internal(format!(
                    "doc {global} is not above previous doc {}",
                    last.unwrap_or_default()
                )));
            }
            last = Some(global);
            visit(global as DocId)?;
        }
    }
    Ok(())
}

/// Feed the members of an ascending `docs` into a per-segment `collector`.
///
/// Global doc ids are translated to segment-local ids, switching segments as
/// ids pass each segment's end. A doc that falls below the current segment's
/// base, or beyond the last segment, is an internal error.
pub fn collect_sorted_doc_set(
    docs: &DocSet,
    segments: &[Arc<dyn SegmentReader>],
    collector: &mut dyn Collector,
) -> Result<()> {
    let mut ordered: Vec<&dyn SegmentReader> =
        segments.iter().map(|segment| segment.as_ref()).collect();
    ordered.sort_by_key(|segment| segment.doc_base());
    let mut leaves = ordered.into_iter();

    let mut segment_base = 0usize;
    let mut segment_end = 0usize;
    for doc in docs.iter() {
        let doc = doc as usize;
        if doc >= segment_end {
            loop {
                let Some(segment) = leaves.next() else {
                    return Err(DocSetError::internal(format!(
                        "doc {doc} lies beyond the last segment"
                    )));
                };
                segment_base = segment.doc_base() as usize;
                segment_end = segment.doc_end();
                if doc < segment_end {
                    collector.set_segment(segment)?;
                    break;
                }
            }
        }
        if doc < segment_base {
            return Err(DocSetError::internal(format!(
                "expected a sorted doc set but doc {doc} precedes segment base {segment_base}"
            )));
        }
        collector.collect((doc - segment_base) as DocId)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Bits;
    use crate::index::{MemoryIndexSearcher, MemorySegment};

    /// A segment whose postings are scripted, including failures.
    #[derive(Debug)]
    struct ScriptedSegment {
        doc_base: DocId,
        max_doc: usize,
        doc_freq: usize,
        docs: Vec<Result<DocId>>,
    }

    struct ScriptedPostings<'a> {
        doc_freq: usize,
        docs: std::slice::Iter<'a, Result<DocId>>,
    }

    impl Postings for ScriptedPostings<'_> {
        fn doc_freq(&self) -> usize {
            self.doc_freq
        }

        fn next_doc(&mut self) -> Result<Option<DocId>> {
            match self.docs.next() {
                None => Ok(None),
                Some(Ok(doc)) => Ok(Some(*doc)),
                Some(Err(err)) => Err(DocSetError::resource_exhausted(err.to_string())),
            }
        }
    }

    impl SegmentReader for ScriptedSegment {
        fn doc_base(&self) -> DocId {
            self.doc_base
        }

        fn max_doc(&self) -> usize {
            self.max_doc
        }

        fn live_docs(&self) -> Option<&dyn Bits> {
            None
        }

        fn postings(&self, _term: &Term) -> Result<Option<Box<dyn Postings + '_>>> {
            Ok(Some(Box::new(ScriptedPostings {
                doc_freq: self.doc_freq,
                docs: self.docs.iter(),
            })))
        }
    }

    fn scripted(doc_freq: usize, docs: Vec<Result<DocId>>) -> Result<MemoryIndexSearcher> {
        let segment = ScriptedSegment {
            doc_base: 0,
            max_doc: 1000,
            doc_freq,
            docs,
        };
        let reader: Arc<dyn SegmentReader> = Arc::new(segment);
        MemoryIndexSearcher::from_readers(vec![reader])
    }

    #[test]
    fn test_postings_failure_propagates() -> Result<()> {
        let searcher = scripted(
            3,
            vec![Ok(1), Err(DocSetError::other("deadline")), Ok(3)],
        )?;
        let err = DocSetBuilder::new(&searcher)
            .build_for_term(&Term::new("f", "t"))
            .unwrap_err();
        assert!(err.is_resource_exhausted());
        Ok(())
    }

    #[test]
    fn test_more_postings_than_doc_freq() -> Result<()> {
        let searcher = scripted(1, vec![Ok(1), Ok(2)])?;
        let err = DocSetBuilder::new(&searcher)
            .build_for_term(&Term::new("f", "t"))
            .unwrap_err();
        assert!(err.is_internal());
        Ok(())
    }

    #[test]
    fn test_unsorted_postings() -> Result<()> {
        let searcher = scripted(2, vec![Ok(5), Ok(4)])?;
        let err = DocSetBuilder::new(&searcher)
            .build_for_term(&Term::new("f", "t"))
            .unwrap_err();
        assert!(err.is_internal());
        Ok(())
    }

    #[test]
    fn test_posting_beyond_segment() -> Result<()> {
        let searcher = scripted(1, vec![Ok(1000)])?;
        let err = DocSetBuilder::new(&searcher)
            .build_for_term(&Term::new("f", "t"))
            .unwrap_err();
        assert!(err.is_internal());
        Ok(())
    }

    #[test]
    fn test_sorted_buffer_has_exact_length() -> Result<()> {
        let segment = MemorySegment::new(0, 1000)
            .with_term_docs("f", "t", [1, 2, 3, 4])?
            .with_deleted([2, 4])?;
        let searcher = MemoryIndexSearcher::new(vec![segment])?;
        let docs = DocSetBuilder::new(&searcher).build_for_term(&Term::new("f", "t"))?;

        match docs.as_ref() {
            DocSet::Sorted(set) => assert_eq!(set.docs(), &[1, 3]),
            other => panic!("expected sorted set, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_all_postings_deleted_is_empty() -> Result<()> {
        let segment = MemorySegment::new(0, 1000)
            .with_term_docs("f", "t", [7])?
            .with_deleted([7])?;
        let searcher = MemoryIndexSearcher::new(vec![segment])?;
        let docs = DocSetBuilder::new(&searcher).build_for_term(&Term::new("f", "t"))?;
        assert!(Arc::ptr_eq(&docs, &DocSet::empty()));
        Ok(())
    }
}
