//! Text buffer implementation using ropey
//!
//! Provides efficient text storage for large documents with O(log n)
//! edits. All public offsets are character offsets, which is what the
//! math regions, selections and annotations are expressed in.

use ropey::Rope;
use std::ops::Range;

/// Text buffer wrapping ropey::Rope
#[derive(Debug, Clone)]
pub struct TextBuffer {
    /// The underlying rope data structure
    rope: Rope,
}

impl TextBuffer {
    /// Create a buffer from a string, normalizing line endings to LF
    pub fn from_text(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n");
        Self {
            rope: Rope::from_str(&normalized),
        }
    }

    /// Get total character count
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Line index containing the given character offset
    pub fn char_to_line(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.rope.len_chars()))
    }

    /// Character range of a line, excluding its trailing newline
    pub fn line_range(&self, line_idx: usize) -> Option<Range<usize>> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(line_idx);
        let line = self.rope.line(line_idx);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
        }
        Some(start..start + len)
    }

    /// Convert a byte offset into a character offset
    pub fn byte_to_char(&self, byte_idx: usize) -> usize {
        self.rope.byte_to_char(byte_idx.min(self.rope.len_bytes()))
    }

    /// Get character at position
    pub fn char_at(&self, char_idx: usize) -> Option<char> {
        if char_idx >= self.rope.len_chars() {
            return None;
        }
        Some(self.rope.char(char_idx))
    }

    /// Get a slice of the buffer as a string, clamped to the buffer
    pub fn slice(&self, range: Range<usize>) -> String {
        let start = range.start.min(self.rope.len_chars());
        let end = range.end.min(self.rope.len_chars());
        if start >= end {
            return String::new();
        }
        self.rope.slice(start..end).to_string()
    }

    /// Insert text at character position
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let idx = char_idx.min(self.rope.len_chars());
        self.rope.insert(idx, text);
    }

    /// Delete a range of characters
    pub fn delete(&mut self, range: Range<usize>) {
        let start = range.start.min(self.rope.len_chars());
        let end = range.end.min(self.rope.len_chars());
        if start < end {
            self.rope.remove(start..end);
        }
    }

    /// Replace a range of characters
    pub fn replace(&mut self, range: Range<usize>, text: &str) {
        self.delete(range.clone());
        self.insert(range.start, text);
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}
