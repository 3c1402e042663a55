//! Error type for document parsing and host I/O.
//!
//! Contract violations (mode misuse, adapter misuse, index overflow,
//! corrupted element strides) are not represented here: they panic
//! synchronously at the offending call.

use thiserror::Error;

/// Error type for slate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input ended before the declared content.
    #[error("input truncated: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// A string-table entry is not valid UTF-8.
    #[error("string table entry {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    /// The declared element-stream size exceeds the remaining input.
    #[error("declared stream size {declared} exceeds remaining {remaining} bytes")]
    StreamOverrun { declared: u64, remaining: usize },

    /// Host file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON parse or serialize failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for slate operations.
pub type Result<T> = std::result::Result<T, Error>;
