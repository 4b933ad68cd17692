//! Contract between the text view and the plugins decorating it

use crate::editor::annotation::AnnotationSet;
use crate::editor::selection::SelectionRange;
use std::ops::Range;

/// What a plugin may ask of the view that owns the document.
///
/// All offsets are character offsets. Implementations are single-threaded;
/// plugins hold them behind `Weak` and upgrade on use.
pub trait EditorHost {
    /// Total characters in the document
    fn len_chars(&self) -> usize;

    /// Text in `from..to`, clamped to the document
    fn slice(&self, from: usize, to: usize) -> String;

    /// Character at `pos`, if any
    fn char_at(&self, pos: usize) -> Option<char>;

    /// Range of the line containing `pos`, excluding its newline
    fn line_range_at(&self, pos: usize) -> Range<usize>;

    /// Current selection ranges (never empty)
    fn selection(&self) -> Vec<SelectionRange>;

    /// Ranges of the document currently on screen, in order
    fn visible_ranges(&self) -> Vec<Range<usize>>;

    /// Whether `[from, to)` overlaps a code block or inline code span
    fn is_inside_code(&self, from: usize, to: usize) -> bool;

    /// Ask for a no-op transaction so plugins recompute their annotations.
    ///
    /// Must not be called while a plugin's `update` is running.
    fn request_refresh(&self);
}

/// What happened in the transaction a plugin is being told about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    /// The document text changed
    pub doc_changed: bool,

    /// The transaction set a new selection
    pub selection_set: bool,

    /// The visible ranges moved
    pub viewport_changed: bool,
}

impl ViewUpdate {
    /// Update sent to a plugin when it is first attached
    pub fn attached() -> Self {
        Self {
            doc_changed: true,
            selection_set: true,
            viewport_changed: true,
        }
    }
}

/// A decoration source attached to a view
pub trait ViewPlugin {
    /// React to a transaction that was just applied to the view
    fn update(&self, update: &ViewUpdate);

    /// The plugin's current annotations
    fn annotations(&self) -> AnnotationSet;
}
