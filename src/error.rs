//! Error types for the mdmend library.
//!
//! The sanitization pipeline itself is total over arbitrary Unicode input and
//! never fails; only the file-based convenience API can return an error.

use std::io;
use thiserror::Error;

/// Result type alias for mdmend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mdmend library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading input from a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
