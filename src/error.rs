//! Error types for Livemath
//!
//! This module defines all custom error types used throughout the crate.
//! Error types are organized by category: typesetting failures are shown to
//! the user in place of the formula, everything else surfaces through the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type encompassing all error categories
#[derive(Error, Debug)]
pub enum AppError {
    /// File I/O related errors
    #[error(transparent)]
    FileIO(#[from] FileError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Typesetting engine never became usable
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Generic unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// File I/O related errors
#[derive(Error, Debug)]
pub enum FileError {
    /// File not found at specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// File is too large to open
    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// File encoding error (non-UTF-8)
    #[error("Unable to read file as text. File may be binary or use unsupported encoding: {path}")]
    EncodingError { path: PathBuf },

    /// Error reading file
    #[error("Could not read file: {path}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error loading configuration file
    #[error("Could not load configuration: {0}")]
    LoadError(String),

    /// Error parsing configuration
    #[error("Invalid configuration format: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration directory error
    #[error("Could not access configuration directory")]
    DirectoryError,
}

/// A single formula failed to typeset.
///
/// The `Display` output is what ends up in the error tooltip, so variants
/// carry the engine's own wording where there is one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The engine rejected the LaTeX source
    #[error("{0}")]
    Syntax(String),

    /// The engine finished but produced nothing to display
    #[error("Typesetting produced no output")]
    EmptyOutput,

    /// The engine did not answer in time
    #[error("Typesetting timed out after {0} ms")]
    Timeout(u64),

    /// The engine crashed or could not be reached
    #[error("Typesetting failed: {0}")]
    Internal(String),

    /// The engine is not available
    #[error(transparent)]
    NotReady(#[from] EngineError),
}

/// Typesetting engine readiness errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The readiness probe gave up
    #[error("Math engine did not become ready after {attempts} attempts: {reason}")]
    NeverReady { attempts: u32, reason: String },
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for typesetting a single formula
pub type RenderResult<T> = Result<T, RenderError>;

impl FileError {
    /// Create a user-friendly error message suitable for the terminal
    pub fn user_message(&self) -> String {
        match self {
            FileError::NotFound(_) => {
                "The file could not be found. It may have been moved or deleted.".to_string()
            }
            FileError::FileTooLarge { max_size, .. } => {
                format!(
                    "This file is too large to open. Maximum file size is {} bytes.",
                    max_size
                )
            }
            FileError::EncodingError { .. } => {
                "This file cannot be opened as text. It may be a binary file or use an unsupported encoding.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
