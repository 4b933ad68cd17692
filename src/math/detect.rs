//! Math region detection
//!
//! Finds `$$...$$` (display) and `$...$` (inline) spans in a window of the
//! document. Every call scans from scratch; a span whose closing delimiter
//! lies outside the window is simply not found.

use crate::editor::host::EditorHost;
use crate::math::MathRegion;
use regex::Regex;
use std::sync::LazyLock;

/// Display math is tried first so `$$a$$` never splits into two inline spans.
/// Inline content may not start or end with whitespace and never contains `$`.
static MATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$([\s\S]+?)\$\$|\$([^\s$](?:[^$]*[^\s$])?)\$").expect("valid math regex")
});

/// Escape character that disables a following delimiter
const ESCAPE: char = '\\';

/// Detect math regions whose opening delimiter lies in `from..to`.
///
/// Offsets are absolute character offsets. Matches preceded by `\` in the
/// document, with blank content, or overlapping code are skipped.
pub fn detect_math_regions(host: &dyn EditorHost, from: usize, to: usize) -> Vec<MathRegion> {
    let slice = host.slice(from, to);
    let mut regions = Vec::new();

    let mut byte_pos = 0;
    let mut char_pos = from;

    for caps in MATH_RE.captures_iter(&slice) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        char_pos += slice[byte_pos..whole.start()].chars().count();
        byte_pos = whole.start();

        let start = char_pos;
        let end = start + whole.as_str().chars().count();

        if start > 0 && host.char_at(start - 1) == Some(ESCAPE) {
            continue;
        }

        let (display, tex) = match (caps.get(1), caps.get(2)) {
            (Some(block), _) => (true, block.as_str()),
            (None, Some(inline)) => (false, inline.as_str()),
            (None, None) => continue,
        };

        let tex = tex.trim();
        if tex.is_empty() {
            continue;
        }

        if host.is_inside_code(start, end) {
            continue;
        }

        regions.push(MathRegion {
            from: start,
            to: end,
            tex: tex.to_string(),
            display,
        });
    }

    regions
}
