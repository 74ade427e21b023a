//! In-memory segments and searcher.
//!
//! Segments hold their postings in hash maps and track deletions in a
//! liveness bitmap. The searcher stitches segments into one doc id space and
//! owns the canonical live doc set.

use std::sync::Arc;

use ahash::AHashMap;
use bit_vec::BitVec;
use log::debug;
use parking_lot::Mutex;

use crate::DocId;
use crate::bits::{Bits, FixedBitSet, copy_range};
use crate::docset::{BitDocSet, DocSet};
use crate::error::{DocSetError, Result};
use crate::search::{Collector, IndexSearcher, Postings, Query, SegmentReader, Term};

/// A segment whose postings live in memory.
#[derive(Debug, Clone)]
pub struct MemorySegment {
    doc_base: DocId,
    max_doc: usize,
    live_docs: Option<BitVec>,
    /// field -> term -> ascending local doc ids
    postings: AHashMap<String, AHashMap<String, Vec<DocId>>>,
}

impl MemorySegment {
    /// Create an empty segment covering `[doc_base, doc_base + max_doc)`.
    pub fn new(doc_base: DocId, max_doc: usize) -> Self {
        MemorySegment {
            doc_base,
            max_doc,
            live_docs: None,
            postings: AHashMap::new(),
        }
    }

    fn check_local(&self, local_doc: DocId) -> Result<()> {
        if local_doc as usize >= self.max_doc {
            return Err(DocSetError::invalid_argument(format!(
                "local doc {local_doc} out of range for segment with max_doc {}",
                self.max_doc
            )));
        }
        Ok(())
    }

    /// Index `text` in `field` for `local_doc`.
    pub fn add_term(&mut self, field: &str, text: &str, local_doc: DocId) -> Result<()> {
        self.check_local(local_doc)?;
        let docs = self
            .postings
            .entry(field.to_string())
            .or_default()
            .entry(text.to_string())
            .or_default();
        let pos = docs.partition_point(|&doc| doc < local_doc);
        if docs.get(pos) != Some(&local_doc) {
            docs.insert(pos, local_doc);
        }
        Ok(())
    }

    /// Index `text` in `field` for every doc of `docs`.
    pub fn with_term_docs<I>(mut self, field: &str, text: &str, docs: I) -> Result<Self>
    where
        I: IntoIterator<Item = DocId>,
    {
        for doc in docs {
            self.add_term(field, text, doc)?;
        }
        Ok(self)
    }

    /// Mark `local_doc` deleted. Returns false if it already was.
    pub fn delete(&mut self, local_doc: DocId) -> Result<bool> {
        self.check_local(local_doc)?;
        let max_doc = self.max_doc;
        let live = self
            .live_docs
            .get_or_insert_with(|| BitVec::from_elem(max_doc, true));
        let was_live = live.get(local_doc as usize).unwrap_or(false);
        live.set(local_doc as usize, false);
        Ok(was_live)
    }

    /// Builder form of [`MemorySegment::delete`].
    pub fn with_deleted<I>(mut self, docs: I) -> Result<Self>
    where
        I: IntoIterator<Item = DocId>,
    {
        for doc in docs {
            self.delete(doc)?;
        }
        Ok(self)
    }
}

impl SegmentReader for MemorySegment {
    fn doc_base(&self) -> DocId {
        self.doc_base
    }

    fn max_doc(&self) -> usize {
        self.max_doc
    }

    fn live_docs(&self) -> Option<&dyn Bits> {
        self.live_docs.as_ref().map(|live| live as &dyn Bits)
    }

    fn postings(&self, term: &Term) -> Result<Option<Box<dyn Postings + '_>>> {
        let docs = self
            .postings
            .get(term.field())
            .and_then(|terms| terms.get(term.text()));
        Ok(docs.map(|docs| {
            let postings = MemoryPostings {
                docs: docs.as_slice(),
                pos: 0,
            };
            Box::new(postings) as Box<dyn Postings + '_>
        }))
    }
}

/// Cursor over an in-memory posting list.
#[derive(Debug)]
struct MemoryPostings<'a> {
    docs: &'a [DocId],
    pos: usize,
}

impl Postings for MemoryPostings<'_> {
    fn doc_freq(&self) -> usize {
        self.docs.len()
    }

    fn next_doc(&mut self) -> Result<Option<DocId>> {
        let doc = self.docs.get(self.pos).copied();
        if doc.is_some() {
            self.pos += 1;
        }
        Ok(doc)
    }
}

/// A searcher over a fixed list of segments.
pub struct MemoryIndexSearcher {
    segments: Vec<Arc<dyn SegmentReader>>,
    max_doc: usize,
    num_docs: usize,
    live_doc_set: Mutex<Option<Arc<DocSet>>>,
    max_collected: Option<usize>,
}

impl MemoryIndexSearcher {
    /// Create a searcher over in-memory segments.
    pub fn new(segments: Vec<MemorySegment>) -> Result<Self> {
        Self::from_readers(
            segments
                .into_iter()
                .map(|segment| Arc::new(segment) as Arc<dyn SegmentReader>)
                .collect(),
        )
    }

    /// Create a searcher over arbitrary segment readers.
    ///
    /// Segments may be listed in any order but must not overlap.
    pub fn from_readers(segments: Vec<Arc<dyn SegmentReader>>) -> Result<Self> {
        let mut ranges: Vec<(usize, usize)> = segments
            .iter()
            .map(|segment| (segment.doc_base() as usize, segment.doc_end()))
            .collect();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(DocSetError::invalid_argument(format!(
                    "segment [{}, {}) overlaps segment [{}, {})",
                    pair[1].0, pair[1].1, pair[0].0, pair[0].1
                )));
            }
        }

        let max_doc = ranges.last().map_or(0, |&(_, end)| end);
        if max_doc > DocId::MAX as usize + 1 {
            return Err(DocSetError::invalid_argument(format!(
                "max_doc {max_doc} exceeds the doc id range"
            )));
        }
        let num_docs = segments.iter().map(|segment| segment.num_live_docs()).sum();

        Ok(MemoryIndexSearcher {
            segments,
            max_doc,
            num_docs,
            live_doc_set: Mutex::new(None),
            max_collected: None,
        })
    }

    /// Fail searches that collect more than `limit` documents.
    pub fn with_max_collected(mut self, limit: usize) -> Self {
        self.max_collected = Some(limit);
        self
    }

    fn build_live_doc_set(&self) -> Result<Arc<DocSet>> {
        if self.num_docs == 0 {
            return Ok(DocSet::empty());
        }

        let mut bits = FixedBitSet::new(self.max_doc);
        for segment in &self.segments {
            let base = segment.doc_base() as usize;
            match segment.live_docs() {
                None => bits.set_range(base, segment.doc_end()),
                Some(live) => {
                    copy_range(live, 0, segment.max_doc(), &mut bits, base)?;
                }
            }
        }

        debug!(
            "materialized live doc set: {} of {} docs",
            self.num_docs, self.max_doc
        );
        Ok(Arc::new(DocSet::Bits(BitDocSet::new(bits, self.num_docs))))
    }

    /// Returns true if every member of `docs` is a live document.
    ///
    /// Combined with a size of `num_docs` this means `docs` holds exactly
    /// the live documents.
    fn holds_only_live_docs(&self, docs: &DocSet) -> bool {
        let mut ordered: Vec<&dyn SegmentReader> =
            self.segments.iter().map(|segment| segment.as_ref()).collect();
        ordered.sort_by_key(|segment| segment.doc_base());
        let mut leaves = ordered.into_iter();

        let mut current: Option<&dyn SegmentReader> = None;
        for doc in docs.iter() {
            while current.is_none_or(|segment| doc as usize >= segment.doc_end()) {
                match leaves.next() {
                    Some(segment) => current = Some(segment),
                    None => return false,
                }
            }
            let Some(segment) = current else {
                return false;
            };
            let base = segment.doc_base();
            if doc < base || !segment.is_live(doc - base) {
                return false;
            }
        }
        true
    }
}

impl IndexSearcher for MemoryIndexSearcher {
    fn max_doc(&self) -> usize {
        self.max_doc
    }

    fn num_docs(&self) -> usize {
        self.num_docs
    }

    fn segments(&self) -> &[Arc<dyn SegmentReader>] {
        &self.segments
    }

    fn live_doc_set(&self) -> Result<Arc<DocSet>> {
        let mut slot = self.live_doc_set.lock();
        if let Some(docs) = slot.as_ref() {
            return Ok(Arc::clone(docs));
        }
        let docs = self.build_live_doc_set()?;
        *slot = Some(Arc::clone(&docs));
        Ok(docs)
    }

    fn offer_live_docs(&self, candidate: Arc<DocSet>, size: usize) -> Arc<DocSet> {
        if size != self.num_docs || candidate.size() != size {
            return candidate;
        }
        if !self.holds_only_live_docs(&candidate) {
            debug!("offered doc set of size {size} contains deleted or unknown docs");
            return candidate;
        }
        let mut slot = self.live_doc_set.lock();
        match slot.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                debug!("adopting offered doc set of size {size} as live docs");
                *slot = Some(Arc::clone(&candidate));
                candidate
            }
        }
    }

    fn search(&self, query: &dyn Query, collector: &mut dyn Collector) -> Result<()> {
        let mut collected = 0usize;
        for segment in &self.segments {
            let segment = segment.as_ref();
            collector.set_segment(segment)?;
            let matches = query.segment_matches(segment)?;
            for doc in matches.iter() {
                let doc = doc as DocId;
                if !segment.is_live(doc) {
                    continue;
                }
                if let Some(limit) = self.max_collected
                    && collected >= limit
                {
                    let reason = format!("query collected more than {limit} documents");
                    collector.abort(&reason);
                    return Err(DocSetError::resource_exhausted(reason));
                }
                collector.collect(doc)?;
                collected += 1;
            }
        }
        Ok(())
    }
}
