//! Error types for lsys.
//!
//! ## Rust Lesson #24: thiserror
//!
//! The `#[error("...")]` attribute writes the `Display` impl for us and
//! `#[from]` generates a `From` conversion, so `?` can turn a
//! `ParseError` into an `LsysError` without any glue code.

use std::path::PathBuf;

use thiserror::Error;

use crate::grammar::ParseError;

/// Everything that can go wrong while loading, growing or drawing an L-system.
#[derive(Debug, Error)]
pub enum LsysError {
    /// The grammar source was malformed. The previously loaded grammar is untouched.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Appending an iteration's geometry would push the buffer past its ceiling.
    #[error("geometry exceeds maximum buffer size: {required} bytes needed, limit is {max}")]
    CapacityExceeded { required: usize, max: usize },

    /// The next symbol string would be longer than the configured limit.
    #[error("symbol string too long: {required} symbols needed, limit is {max}")]
    SymbolLimitExceeded { required: usize, max: usize },

    /// An iteration that was never generated was requested.
    #[error("iteration {index} out of range ({len} iterations generated)")]
    IndexOutOfRange { index: usize, len: usize },

    /// `advance` was called before any grammar was loaded.
    #[error("no L-system loaded")]
    NotLoaded,

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LsysError {
    /// True for the recoverable "ran out of room" conditions: the vertex
    /// buffer or the symbol string hit its ceiling.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            LsysError::CapacityExceeded { .. } | LsysError::SymbolLimitExceeded { .. }
        )
    }
}
