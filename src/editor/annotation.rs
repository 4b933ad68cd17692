//! Render annotations handed to the host view
//!
//! An annotation changes how a range of text is displayed without touching
//! the text itself. Plugins produce a fresh [`AnnotationSet`] on every
//! rebuild; the host never patches one incrementally.

use crate::math::Graphic;
use std::fmt;

/// Wrapper class for block math output
pub const MATH_DISPLAY_CLASS: &str = "cm-math-display";
/// Wrapper class for inline math output
pub const MATH_INLINE_CLASS: &str = "cm-math-inline";
/// Extra class for a formula that failed to typeset
pub const MATH_ERROR_CLASS: &str = "cm-math-error";
/// Mark class for `$` / `$$` while the cursor is inside
pub const MATH_DELIMITER_CLASS: &str = "cm-math-delimiter";
/// Mark class for inline LaTeX source while the cursor is inside
pub const MATH_SOURCE_CLASS: &str = "cm-math-source";
/// Mark class for visible heading hashes
pub const HEADING_HASH_CLASS: &str = "cm-heading-hash";

/// How a range is displayed
#[derive(Debug, Clone, PartialEq)]
pub enum Treatment {
    /// Style the whole line starting at the range with a class
    LineClass(&'static str),
    /// Keep the text, add a class
    Mark(&'static str),
    /// Hide the text and draw a widget instead
    Replace(Widget),
    /// Hide the text entirely
    Hide,
}

/// Replacement content for a hidden range
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Math(MathWidget),
    Error(ErrorWidget),
}

impl Widget {
    /// HTML for this widget
    pub fn to_html(&self) -> String {
        match self {
            Widget::Math(w) => w.to_html(),
            Widget::Error(w) => w.to_html(),
        }
    }
}

/// Typeset output of a formula
#[derive(Debug, Clone)]
pub struct MathWidget {
    pub graphic: Graphic,
    pub display: bool,
}

impl MathWidget {
    pub fn new(graphic: Graphic, display: bool) -> Self {
        Self { graphic, display }
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<span class="{}">{}</span>"#,
            mode_class(self.display),
            self.graphic.markup()
        )
    }
}

impl PartialEq for MathWidget {
    fn eq(&self, other: &Self) -> bool {
        self.display == other.display && self.graphic.markup() == other.graphic.markup()
    }
}

/// Raw source shown in place of a formula the engine rejected
#[derive(Debug, Clone)]
pub struct ErrorWidget {
    pub tex: String,
    pub message: String,
    pub display: bool,
}

impl ErrorWidget {
    pub fn new(tex: impl Into<String>, message: impl Into<String>, display: bool) -> Self {
        Self {
            tex: tex.into(),
            message: message.into(),
            display,
        }
    }

    /// The source text with its delimiters restored
    pub fn source(&self) -> String {
        if self.display {
            format!("$${}$$", self.tex)
        } else {
            format!("${}$", self.tex)
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<span class="{} {}" title="{}">{}</span>"#,
            mode_class(self.display),
            MATH_ERROR_CLASS,
            escape_html(&self.message),
            escape_html(&self.source())
        )
    }
}

// The message is tooltip-only; two error widgets for the same source are
// interchangeable.
impl PartialEq for ErrorWidget {
    fn eq(&self, other: &Self) -> bool {
        self.tex == other.tex && self.display == other.display
    }
}

fn mode_class(display: bool) -> &'static str {
    if display {
        MATH_DISPLAY_CLASS
    } else {
        MATH_INLINE_CLASS
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// A treatment applied to the half-open character range `from..to`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub from: usize,
    pub to: usize,
    pub treatment: Treatment,
}

impl Annotation {
    pub fn new(from: usize, to: usize, treatment: Treatment) -> Self {
        Self { from, to, treatment }
    }

    pub fn mark(from: usize, to: usize, class: &'static str) -> Self {
        Self::new(from, to, Treatment::Mark(class))
    }

    pub fn replace(from: usize, to: usize, widget: Widget) -> Self {
        Self::new(from, to, Treatment::Replace(widget))
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} ", self.from, self.to)?;
        match &self.treatment {
            Treatment::LineClass(class) => write!(f, "line {}", class),
            Treatment::Mark(class) => write!(f, "mark {}", class),
            Treatment::Replace(Widget::Math(w)) => {
                write!(f, "math {}", if w.display { "display" } else { "inline" })
            }
            Treatment::Replace(Widget::Error(w)) => write!(f, "error {:?}", w.message),
            Treatment::Hide => write!(f, "hide"),
        }
    }
}

/// Annotations sorted by start offset, then end offset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    items: Vec<Annotation>,
}

impl AnnotationSet {
    /// The empty set
    pub fn none() -> Self {
        Self::default()
    }

    /// Sort annotations into the order the host requires.
    ///
    /// The sort is stable, so annotations sharing a range keep the order they
    /// were produced in.
    pub fn from_unsorted(mut items: Vec<Annotation>) -> Self {
        items.sort_by(|a, b| a.from.cmp(&b.from).then(a.to.cmp(&b.to)));
        Self { items }
    }

    /// Merge several sets into one sorted set
    pub fn merge(sets: impl IntoIterator<Item = AnnotationSet>) -> Self {
        Self::from_unsorted(sets.into_iter().flat_map(|s| s.items).collect())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    /// Every replacement widget, in document order
    pub fn widgets(&self) -> impl Iterator<Item = (&Annotation, &Widget)> {
        self.items.iter().filter_map(|a| match &a.treatment {
            Treatment::Replace(w) => Some((a, w)),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
