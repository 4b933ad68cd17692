//! In-memory editor view
//!
//! `EditorView` owns a document, its selection and the visible ranges, and
//! fans every transaction out to its attached plugins. It is the host the
//! CLI runs against and what the integration tests drive.

use crate::editor::annotation::AnnotationSet;
use crate::editor::buffer::TextBuffer;
use crate::editor::host::{EditorHost, ViewPlugin, ViewUpdate};
use crate::editor::selection::{map_pos, SelectionRange};
use crate::editor::syntax::CodeIndex;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

/// A single text replacement, in the coordinates left by earlier changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

/// A batch of edits, a new selection and/or a new viewport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub changes: Vec<Change>,
    pub selection: Option<Vec<SelectionRange>>,
    pub visible: Option<Vec<Range<usize>>>,
}

impl Transaction {
    /// An empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `from..to` with `text`
    pub fn replace(mut self, from: usize, to: usize, text: impl Into<String>) -> Self {
        self.changes.push(Change {
            from,
            to,
            insert: text.into(),
        });
        self
    }

    /// Insert `text` at `pos`
    pub fn insert(self, pos: usize, text: impl Into<String>) -> Self {
        self.replace(pos, pos, text)
    }

    /// Set the selection
    pub fn select(mut self, ranges: Vec<SelectionRange>) -> Self {
        self.selection = Some(ranges);
        self
    }

    /// Collapse the selection to a cursor at `pos`
    pub fn cursor(self, pos: usize) -> Self {
        self.select(vec![SelectionRange::cursor(pos)])
    }

    /// Set the visible ranges
    pub fn scroll(mut self, visible: Vec<Range<usize>>) -> Self {
        self.visible = Some(visible);
        self
    }
}

/// Reference host: document, selection, viewport and plugins
pub struct EditorView {
    buffer: RefCell<TextBuffer>,
    selection: RefCell<Vec<SelectionRange>>,
    visible: RefCell<Vec<Range<usize>>>,
    code: RefCell<CodeIndex>,
    plugins: RefCell<Vec<Rc<dyn ViewPlugin>>>,
}

impl EditorView {
    /// Open a document with the cursor at the start and all of it visible
    pub fn new(text: &str) -> Rc<Self> {
        let buffer = TextBuffer::from_text(text);
        let len = buffer.len_chars();
        let code = CodeIndex::build(&buffer);
        Rc::new(Self {
            buffer: RefCell::new(buffer),
            selection: RefCell::new(vec![SelectionRange::cursor(0)]),
            visible: RefCell::new(vec![0..len]),
            code: RefCell::new(code),
            plugins: RefCell::new(Vec::new()),
        })
    }

    /// Attach a plugin and give it its first update
    pub fn attach(&self, plugin: Rc<dyn ViewPlugin>) {
        self.plugins.borrow_mut().push(Rc::clone(&plugin));
        plugin.update(&ViewUpdate::attached());
    }

    /// The whole document
    pub fn text(&self) -> String {
        self.buffer.borrow().to_string()
    }

    /// Apply a transaction and notify every plugin
    pub fn dispatch(&self, tr: Transaction) {
        let mut update = ViewUpdate::default();

        if !tr.changes.is_empty() {
            let mut buffer = self.buffer.borrow_mut();
            let mut selection = self.selection.borrow_mut();
            let mut visible = self.visible.borrow_mut();
            let old_visible = visible.clone();
            let showed_everything =
                old_visible.len() == 1 && old_visible[0] == (0..buffer.len_chars());

            for change in &tr.changes {
                let len = buffer.len_chars();
                let from = change.from.min(len);
                let to = change.to.clamp(from, len);
                let inserted = change.insert.chars().count();

                buffer.replace(from..to, &change.insert);

                for range in selection.iter_mut() {
                    *range = range.map_change(from..to, inserted);
                }
                for range in visible.iter_mut() {
                    *range = map_pos(range.start, &(from..to), inserted)
                        ..map_pos(range.end, &(from..to), inserted);
                }
            }

            // A view showing the whole document keeps showing all of it
            if showed_everything {
                *visible = vec![0..buffer.len_chars()];
            }
            *self.code.borrow_mut() = CodeIndex::build(&buffer);
            update.doc_changed = true;
            update.viewport_changed = *visible != old_visible;
        }

        if let Some(ranges) = tr.selection {
            let len = self.buffer.borrow().len_chars();
            let mut ranges: Vec<_> = ranges.into_iter().map(|r| r.clamp(len)).collect();
            if ranges.is_empty() {
                ranges.push(SelectionRange::cursor(0));
            }
            *self.selection.borrow_mut() = ranges;
            update.selection_set = true;
        }

        if let Some(ranges) = tr.visible {
            let len = self.buffer.borrow().len_chars();
            let ranges: Vec<_> = ranges
                .into_iter()
                .map(|r| r.start.min(len)..r.end.min(len))
                .filter(|r| r.start <= r.end)
                .collect();
            let mut visible = self.visible.borrow_mut();
            if *visible != ranges {
                *visible = ranges;
                update.viewport_changed = true;
            }
        }

        let plugins: Vec<_> = self.plugins.borrow().iter().cloned().collect();
        for plugin in plugins {
            plugin.update(&update);
        }
    }

    /// Annotations from every plugin, merged and sorted
    pub fn annotations(&self) -> AnnotationSet {
        let plugins: Vec<_> = self.plugins.borrow().iter().cloned().collect();
        AnnotationSet::merge(plugins.iter().map(|p| p.annotations()))
    }
}

impl EditorHost for EditorView {
    fn len_chars(&self) -> usize {
        self.buffer.borrow().len_chars()
    }

    fn slice(&self, from: usize, to: usize) -> String {
        self.buffer.borrow().slice(from..to)
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.buffer.borrow().char_at(pos)
    }

    fn line_range_at(&self, pos: usize) -> Range<usize> {
        let buffer = self.buffer.borrow();
        let line = buffer.char_to_line(pos);
        buffer.line_range(line).unwrap_or(pos..pos)
    }

    fn selection(&self) -> Vec<SelectionRange> {
        self.selection.borrow().clone()
    }

    fn visible_ranges(&self) -> Vec<Range<usize>> {
        self.visible.borrow().clone()
    }

    fn is_inside_code(&self, from: usize, to: usize) -> bool {
        self.code.borrow().is_inside_code(from, to)
    }

    fn request_refresh(&self) {
        self.dispatch(Transaction::new());
    }
}
