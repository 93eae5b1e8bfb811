//! Value error types.

use thiserror::Error;

/// Errors raised while decoding values read back from a guest.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A flat value table is malformed (bad index, shared node, missing root).
    #[error("malformed flat value: {0}")]
    Wire(String),

    /// A structured value does not have the shape a schema expects.
    #[error("schema mismatch: {0}")]
    Schema(String),
}

impl Error {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
