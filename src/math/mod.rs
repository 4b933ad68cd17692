//! Math module for Livemath
//!
//! Renders `$...$` and `$$...$$` regions of a live document:
//! - Region detection
//! - Content-addressed render cache
//! - Serial render queue
//! - Typesetting engine and readiness gate
//! - The controller tying them to a view

pub mod cache;
pub mod controller;
pub mod detect;
pub mod engine;
pub mod queue;

pub use cache::RenderCache;
pub use controller::MathController;
pub use detect::detect_math_regions;
pub use engine::{MathBackend, PulldownLatexBackend, ReadinessState, Typesetter};
pub use queue::RenderQueue;

use std::fmt;

/// A delimited LaTeX span found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathRegion {
    /// Offset of the opening delimiter
    pub from: usize,
    /// Offset just past the closing delimiter
    pub to: usize,
    /// Source between the delimiters, trimmed
    pub tex: String,
    /// `$$` block math rather than `$` inline math
    pub display: bool,
}

impl MathRegion {
    /// Length of one delimiter (`$$` or `$`)
    pub fn delimiter_len(&self) -> usize {
        if self.display {
            2
        } else {
            1
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.tex, self.display)
    }
}

/// Content-addressed key: `D:` or `I:` followed by the trimmed LaTeX
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(tex: &str, display: bool) -> Self {
        Self(format!("{}:{}", if display { "D" } else { "I" }, tex))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typeset output of one formula (MathML or SVG markup)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graphic(String);

impl Graphic {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn markup(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}
