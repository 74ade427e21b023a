//! Configuration for doc set construction.

use serde::{Deserialize, Serialize};

use crate::error::{DocSetError, Result};

/// The cut-off between sorted and bitmap sets for an index of `max_doc`
/// documents: `(max_doc >> 6) + 5`.
///
/// Results at or below this size are stored as sorted id arrays, larger
/// results as bitmaps.
pub fn small_set_size(max_doc: usize) -> usize {
    DocSetConfig::default().small_set_size(max_doc)
}

/// Tunables for choosing doc set representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocSetConfig {
    /// Right shift applied to `max_doc` when computing the small set size.
    #[serde(default = "default_small_set_shift")]
    pub small_set_shift: u32,

    /// Constant added after shifting.
    #[serde(default = "default_small_set_slack")]
    pub small_set_slack: usize,

    /// Convert bitmap results back to sorted arrays when deletions leave
    /// them below the small set size.
    #[serde(default = "default_shrink_sparse_bitmaps")]
    pub shrink_sparse_bitmaps: bool,
}

fn default_small_set_shift() -> u32 {
    6
}

fn default_small_set_slack() -> usize {
    5
}

fn default_shrink_sparse_bitmaps() -> bool {
    true
}

impl Default for DocSetConfig {
    fn default() -> Self {
        DocSetConfig {
            small_set_shift: default_small_set_shift(),
            small_set_slack: default_small_set_slack(),
            shrink_sparse_bitmaps: default_shrink_sparse_bitmaps(),
        }
    }
}

impl DocSetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DocSetConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used.
    pub fn validate(&self) -> Result<()> {
        if self.small_set_shift >= usize::BITS {
            return Err(DocSetError::invalid_config(format!(
                "small_set_shift must be below {}, got {}",
                usize::BITS,
                self.small_set_shift
            )));
        }
        Ok(())
    }

    pub fn with_small_set_shift(mut self, shift: u32) -> Self {
        self.small_set_shift = shift;
        self
    }

    pub fn with_small_set_slack(mut self, slack: usize) -> Self {
        self.small_set_slack = slack;
        self
    }

    pub fn with_shrink_sparse_bitmaps(mut self, shrink: bool) -> Self {
        self.shrink_sparse_bitmaps = shrink;
        self
    }

    /// Small set size for an index of `max_doc` documents.
    pub fn small_set_size(&self, max_doc: usize) -> usize {
        max_doc
            .checked_shr(self.small_set_shift)
            .unwrap_or(0)
            .saturating_add(self.small_set_slack)
    }
}
