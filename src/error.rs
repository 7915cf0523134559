//! Error types for cvscan

use std::io;
use thiserror::Error;

/// Result type for cvscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors that can occur while scanning
#[derive(Debug, Error)]
pub enum ScanError {
    /// I/O error while opening or reading a file or directory
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bytecode entry ended before the version marker
    #[error("Truncated class file header: needed 8 bytes, found {found}")]
    Truncated {
        /// Number of header bytes that were available
        found: usize,
    },

    /// Archive container could not be parsed
    #[error("Corrupt archive: {0}")]
    ArchiveCorruption(String),

    /// Archive entry uses a feature the reader does not handle
    #[error("Unsupported archive entry: {0}")]
    UnsupportedEntry(String),

    /// Nested archive chain exceeds the configured ceiling
    #[error("Archive nesting depth {depth} exceeds limit of {limit}")]
    RecursionLimit {
        /// Depth the nested archive would have been opened at
        depth: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report output could not be written
    #[error("Failed to write report: {0}")]
    Report(#[source] io::Error),
}

impl ScanError {
    /// Whether this error ends the whole scan rather than a single item
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Report(_))
    }
}
