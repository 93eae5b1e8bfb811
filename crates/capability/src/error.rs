//! Capability error types.

use thiserror::Error;

/// Capability configuration errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Failed to parse a grants file.
    #[error("failed to parse grants: {0}")]
    Parse(String),

    /// An I/O error occurred while reading grants.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
