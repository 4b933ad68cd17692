//! Code structure index for Markdown documents
//!
//! Answers "is this range inside code?" for plugins that must leave code
//! alone. Built with pulldown-cmark's offset iterator; fenced blocks,
//! indented blocks and inline code spans are recorded as character ranges.

use crate::editor::buffer::TextBuffer;
use pulldown_cmark::{Event, Options, Parser, Tag};
use std::ops::Range;

/// Sorted, non-overlapping character ranges covered by code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeIndex {
    ranges: Vec<Range<usize>>,
}

impl CodeIndex {
    /// Parse the buffer and collect every code block and code span
    pub fn build(buffer: &TextBuffer) -> Self {
        let text = buffer.to_string();

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut ranges: Vec<Range<usize>> = Vec::new();
        for (event, range) in Parser::new_ext(&text, options).into_offset_iter() {
            let is_code = matches!(event, Event::Start(Tag::CodeBlock(_)) | Event::Code(_));
            if !is_code {
                continue;
            }
            let start = buffer.byte_to_char(range.start);
            let end = buffer.byte_to_char(range.end);
            if start >= end {
                continue;
            }
            // Spans nested in an already recorded block add nothing
            match ranges.last_mut() {
                Some(last) if start < last.end => last.end = last.end.max(end),
                _ => ranges.push(start..end),
            }
        }

        Self { ranges }
    }

    /// True when `[from, to)` overlaps any code block or span
    pub fn is_inside_code(&self, from: usize, to: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= from);
        self.ranges
            .get(idx)
            .is_some_and(|r| r.start < to.max(from + 1))
    }
}
