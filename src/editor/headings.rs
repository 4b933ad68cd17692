//! Heading decorations
//!
//! Styles ATX headings (`#` to `####`) by line and hides the `# ` prefix
//! unless the cursor is on the line or the heading has no text yet.

use crate::editor::annotation::{Annotation, AnnotationSet, Treatment, HEADING_HASH_CLASS};
use crate::editor::host::{EditorHost, ViewPlugin, ViewUpdate};
use crate::editor::selection::cursor_in_range;
use regex::Regex;
use std::cell::RefCell;
use std::rc::Weak;
use std::sync::LazyLock;

/// 1-4 hashes at line start, followed by whitespace or end of line
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,4})(\s|$)").expect("valid heading regex"));

/// Line class for a heading level (1-4)
pub fn heading_class(level: usize) -> Option<&'static str> {
    match level {
        1 => Some("cm-heading-1"),
        2 => Some("cm-heading-2"),
        3 => Some("cm-heading-3"),
        4 => Some("cm-heading-4"),
        _ => None,
    }
}

/// Build heading annotations for every visible line
pub fn build_heading_annotations(host: &dyn EditorHost) -> AnnotationSet {
    let mut annotations = Vec::new();
    let selection = host.selection();
    let len = host.len_chars();

    for visible in host.visible_ranges() {
        let mut pos = visible.start;
        loop {
            let line = host.line_range_at(pos);
            let text = host.slice(line.start, line.end);

            if let Some(caps) = HEADING_RE.captures(&text) {
                let hash_count = caps[1].len();
                if let Some(class) = heading_class(hash_count) {
                    let has_space = matches!(&caps[2], " " | "\t");
                    let has_content = has_space && text.len() > caps[0].len();

                    annotations.push(Annotation::new(
                        line.start,
                        line.start,
                        Treatment::LineClass(class),
                    ));

                    if !has_content || cursor_in_range(&selection, line.start, line.end) {
                        annotations.push(Annotation::mark(
                            line.start,
                            line.start + hash_count,
                            HEADING_HASH_CLASS,
                        ));
                    } else {
                        annotations.push(Annotation::new(
                            line.start,
                            line.start + hash_count + 1,
                            Treatment::Hide,
                        ));
                    }
                }
            }

            if line.end >= visible.end.min(len) || line.end >= len {
                break;
            }
            pos = line.end + 1;
        }
    }

    AnnotationSet::from_unsorted(annotations)
}

/// Plugin wrapper rebuilding heading annotations on every update
pub struct HeadingsPlugin {
    host: Weak<dyn EditorHost>,
    annotations: RefCell<AnnotationSet>,
}

impl HeadingsPlugin {
    pub fn new(host: Weak<dyn EditorHost>) -> Self {
        Self {
            host,
            annotations: RefCell::new(AnnotationSet::none()),
        }
    }
}

impl ViewPlugin for HeadingsPlugin {
    fn update(&self, _update: &ViewUpdate) {
        if let Some(host) = self.host.upgrade() {
            *self.annotations.borrow_mut() = build_heading_annotations(host.as_ref());
        }
    }

    fn annotations(&self) -> AnnotationSet {
        self.annotations.borrow().clone()
    }
}
