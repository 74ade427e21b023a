//! Collector that turns query matches into a [`DocSet`].

use std::sync::Arc;

use log::trace;

use crate::DocId;
use crate::bits::FixedBitSet;
use crate::config::DocSetConfig;
use crate::docset::{BitDocSet, DocSet, SortedDocSet};
use crate::error::{DocSetError, Result};
use crate::search::{Collector, SegmentReader};

#[derive(Debug)]
enum Failure {
    Aborted(String),
    Rejected(String),
}

/// Accumulates the matches of one query evaluation.
///
/// Matches are buffered in a small array until there are more than the small
/// set size, then moved into a bitmap over the whole index. The collector is
/// finalized with [`DocSetCollector::into_doc_set`], which consumes it.
#[derive(Debug)]
pub struct DocSetCollector {
    max_doc: usize,
    small_set_size: usize,
    scratch: Vec<DocId>,
    bits: Option<FixedBitSet>,
    /// Exact number of set bits once `bits` is in use.
    bit_count: usize,
    in_order: bool,
    base: DocId,
    segment_max_doc: usize,
    failure: Option<Failure>,
}

impl DocSetCollector {
    /// Create a collector for an index of `max_doc` documents.
    pub fn new(max_doc: usize) -> Result<Self> {
        Self::with_config(max_doc, &DocSetConfig::default())
    }

    pub fn with_config(max_doc: usize, config: &DocSetConfig) -> Result<Self> {
        if max_doc > DocId::MAX as usize + 1 {
            return Err(DocSetError::invalid_argument(format!(
                "max_doc {max_doc} exceeds the doc id range"
            )));
        }
        Ok(DocSetCollector {
            max_doc,
            small_set_size: config.small_set_size(max_doc),
            scratch: Vec::new(),
            bits: None,
            bit_count: 0,
            in_order: true,
            base: 0,
            segment_max_doc: 0,
            failure: None,
        })
    }

    /// Number of docs collected so far.
    pub fn size(&self) -> usize {
        match self.bits {
            Some(_) => self.bit_count,
            None => self.scratch.len(),
        }
    }

    pub fn max_doc(&self) -> usize {
        self.max_doc
    }

    fn reject(&mut self, msg: String) -> DocSetError {
        self.failure = Some(Failure::Rejected(msg.clone()));
        DocSetError::internal(msg)
    }

    fn spill(&mut self, doc: DocId) {
        let mut bits = FixedBitSet::new(self.max_doc);
        for &scratch_doc in &self.scratch {
            bits.set(scratch_doc as usize);
        }
        bits.set(doc as usize);
        self.bit_count = bits.cardinality();
        trace!(
            "collector spilled {} docs into a bitmap of {} bits",
            self.bit_count, self.max_doc
        );
        self.scratch = Vec::new();
        self.bits = Some(bits);
    }

    /// Finish collection and build the doc set.
    ///
    /// Fails if collection was aborted or a collected doc was rejected, so a
    /// partial result is never mistaken for a complete one.
    pub fn into_doc_set(self) -> Result<Arc<DocSet>> {
        match self.failure {
            Some(Failure::Aborted(reason)) => {
                return Err(DocSetError::resource_exhausted(format!(
                    "collection was aborted: {reason}"
                )));
            }
            Some(Failure::Rejected(reason)) => {
                return Err(DocSetError::internal(format!(
                    "collection failed: {reason}"
                )));
            }
            None => {}
        }

        let docs = match self.bits {
            Some(bits) => {
                let set = BitDocSet::new(bits, self.bit_count);
                if set.size() <= self.small_set_size {
                    DocSet::Sorted(set.to_small_set())
                } else {
                    DocSet::Bits(set)
                }
            }
            None => {
                let mut scratch = self.scratch;
                if scratch.is_empty() {
                    return Ok(DocSet::empty());
                }
                if !self.in_order {
                    scratch.sort_unstable();
                    scratch.dedup();
                }
                DocSet::Sorted(SortedDocSet::from_sorted(scratch))
            }
        };
        Ok(Arc::new(docs))
    }
}

impl Collector for DocSetCollector {
    fn set_segment(&mut self, segment: &dyn SegmentReader) -> Result<()> {
        if segment.doc_end() > self.max_doc {
            return Err(self.reject(format!(
                "segment [{}, {}) extends beyond max_doc {}",
                segment.doc_base(),
                segment.doc_end(),
                self.max_doc
            )));
        }
        self.base = segment.doc_base();
        self.segment_max_doc = segment.max_doc();
        Ok(())
    }

    fn collect(&mut self, doc: DocId) -> Result<()> {
        if self.failure.is_some() {
            return Err(DocSetError::internal("collect called on a failed collector"));
        }
        if doc as usize >= self.segment_max_doc {
            return Err(self.reject(format!(
                "doc {doc} outside current segment of {} docs",
                self.segment_max_doc
            )));
        }
        let global = self.base + doc;

        if let Some(bits) = self.bits.as_mut() {
            if !bits.get(global as usize) {
                bits.set(global as usize);
                self.bit_count += 1;
            }
            return Ok(());
        }

        if let Some(&last) = self.scratch.last() {
            if global == last {
                return Ok(());
            }
            if global < last {
                self.in_order = false;
            }
        }
        if self.scratch.len() < self.small_set_size {
            self.scratch.push(global);
        } else {
            self.spill(global);
        }
        Ok(())
    }

    fn abort(&mut self, reason: &str) {
        self.failure = Some(Failure::Aborted(reason.to_string()));
    }
}
