//! Livemath - live math rendering for Markdown editors
//!
//! Detects `$...$` and `$$...$$` regions in a document, typesets them off the
//! editing path and decorates the view with the results, showing raw LaTeX
//! wherever the cursor is.

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod math;

pub use config::Config;
pub use error::{AppError, AppResult};
