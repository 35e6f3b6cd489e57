//! Error types for the octet buffer layer
//!
//! Every range violation on any of the buffer variants surfaces as one of
//! these errors instead of a panic, so a malformed frame can be dropped by
//! the caller without disturbing anything else.

use thiserror::Error;

/// Errors that can occur when reading or writing octet buffers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OctetError {
    #[error("Index out of bounds: offset {index} + length {length} > size {size}")]
    IndexOutOfBounds {
        index: usize,
        length: usize,
        size: usize,
    },

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Buffer is read-only")]
    ReadOnly,
}

/// Result type for octet buffer operations
pub type OctetResult<T> = Result<T, OctetError>;
