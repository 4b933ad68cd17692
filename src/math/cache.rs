//! In-memory cache of typeset formulas keyed by LaTeX source and mode.
//!
//! Eviction is by insertion order, not recency: a hit does not move an
//! entry, and overwriting a key keeps its original slot.

use crate::math::{CacheKey, Graphic};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    entries: IndexMap<CacheKey, Graphic>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached graphic, or `None` on a miss
    pub fn get(&self, key: &CacheKey) -> Option<Graphic> {
        self.entries.get(key).cloned()
    }

    /// Stores a copy of `graphic`, replacing any previous entry in place
    pub fn put(&mut self, key: CacheKey, graphic: &Graphic) {
        self.entries.insert(key, graphic.clone());
    }

    /// Drops the oldest-inserted entries until at most `max_size` remain
    pub fn evict_oldest(&mut self, max_size: usize) {
        let excess = self.entries.len().saturating_sub(max_size);
        if excess > 0 {
            log::debug!("Evicting {} cached formulas", excess);
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
