//! Selection ranges in character offsets
//!
//! A selection is a non-empty list of ranges; a collapsed range is a plain
//! cursor. Plugins use [`cursor_in_range`] to keep source text visible
//! wherever the user is editing.

use serde::{Deserialize, Serialize};

/// One selection range (anchor point plus active head)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionRange {
    /// Where the selection started
    pub anchor: usize,

    /// Where the cursor currently is
    pub head: usize,
}

impl SelectionRange {
    /// Create a new selection range
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor with no selection)
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Check if selection is collapsed (no text selected)
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// The start position (earlier in document)
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// The end position (later in document)
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// True when this range touches or overlaps `[from, to]`
    pub fn touches(&self, from: usize, to: usize) -> bool {
        self.from() <= to && self.to() >= from
    }

    /// Map both ends through a replacement of `removed` by `inserted_len` chars
    pub fn map_change(self, removed: std::ops::Range<usize>, inserted_len: usize) -> Self {
        Self {
            anchor: map_pos(self.anchor, &removed, inserted_len),
            head: map_pos(self.head, &removed, inserted_len),
        }
    }

    /// Clamp both ends into `0..=len`
    pub fn clamp(self, len: usize) -> Self {
        Self::new(self.anchor.min(len), self.head.min(len))
    }
}

/// Map a single offset through a text replacement.
///
/// Positions inside the replaced range move to the end of the inserted text.
pub fn map_pos(pos: usize, removed: &std::ops::Range<usize>, inserted_len: usize) -> usize {
    if pos < removed.start {
        pos
    } else if pos >= removed.end {
        pos - (removed.end - removed.start) + inserted_len
    } else {
        removed.start + inserted_len
    }
}

/// Returns `true` when any selection cursor or range overlaps `[from, to]`.
pub fn cursor_in_range(selection: &[SelectionRange], from: usize, to: usize) -> bool {
    selection.iter().any(|range| range.touches(from, to))
}
