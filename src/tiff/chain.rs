//! Cycle and length guard for IFD chains.
//!
//! A chain is followed through next-IFD offsets, so a file can point a
//! directory back at itself or at an earlier one without ever getting
//! deeper. The guard remembers every offset visited from one traversal root
//! and caps how many directories the root may yield.

use std::collections::HashSet;

use crate::error::ChainError;

/// Default cap on the number of directories in one chain.
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 10_000;

/// Visited-offset set for one traversal root.
#[derive(Debug, Clone)]
pub struct ChainGuard {
    visited: HashSet<u64>,
    max_length: usize,
}

impl ChainGuard {
    /// Create a guard allowing at most `max_length` directories.
    pub fn new(max_length: usize) -> Self {
        Self {
            visited: HashSet::new(),
            max_length,
        }
    }

    /// Record that the directory at `offset` is about to be read.
    ///
    /// Fails if the offset was already visited from this root or if the
    /// chain would exceed its length cap. Either way the caller must stop
    /// following this chain.
    pub fn enter(&mut self, offset: u64) -> Result<(), ChainError> {
        if self.visited.contains(&offset) {
            return Err(ChainError::Cycle { offset });
        }
        if self.visited.len() >= self.max_length {
            return Err(ChainError::TooLong {
                limit: self.max_length,
            });
        }
        self.visited.insert(offset);
        Ok(())
    }

    /// Number of directories entered so far.
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    /// Whether no directory has been entered yet.
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

impl Default for ChainGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHAIN_LENGTH)
    }
}
