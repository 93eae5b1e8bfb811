//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No component path was given on the command line or in the config.
    #[error("no guest component configured: pass --component or set guest.component")]
    MissingComponent,

    /// The input document is not valid JSON.
    #[error("invalid input JSON: {0}")]
    Input(#[from] serde_json::Error),

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A grants file could not be read or parsed.
    #[error(transparent)]
    Capability(#[from] capability::Error),

    /// An error occurred in the host layer.
    #[error(transparent)]
    Host(#[from] host::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
