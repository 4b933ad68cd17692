//! Editor module for Livemath
//!
//! The document side of the pipeline:
//! - Text buffer management (using ropey)
//! - Selection ranges and change mapping
//! - Code span index (using pulldown-cmark)
//! - The host/plugin contract and annotations
//! - An in-memory view implementing the host
//! - Heading decorations

pub mod annotation;
pub mod buffer;
pub mod headings;
pub mod host;
pub mod selection;
pub mod syntax;
pub mod view;

pub use annotation::{Annotation, AnnotationSet, ErrorWidget, MathWidget, Treatment, Widget};
pub use buffer::TextBuffer;
pub use headings::HeadingsPlugin;
pub use host::{EditorHost, ViewPlugin, ViewUpdate};
pub use selection::{cursor_in_range, SelectionRange};
pub use syntax::CodeIndex;
pub use view::{Change, EditorView, Transaction};
