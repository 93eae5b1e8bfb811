use capability::CapabilityKind;
use thiserror::Error;

/// Host errors.
///
/// Every failure of a capability call or of the guest invocation is
/// returned as one of these; none is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The guest could not be loaded or its imports could not be satisfied.
    #[error("failed to instantiate guest: {0}")]
    Instantiation(String),

    /// An export the driver needs is missing from the guest.
    #[error("guest export not found: {0}")]
    Binding(String),

    /// The guest asked for a capability this provider withholds.
    #[error("capability not granted: {0}")]
    CapabilityNotGranted(CapabilityKind),

    #[error("stream error: {0}")]
    Stream(String),

    /// The guest reported a failure; the message is the guest's, verbatim.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The guest trapped or a host function failed during a call.
    #[error("guest trapped: {0}")]
    Trap(String),

    #[error(transparent)]
    Codec(#[from] value::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn instantiation(error: wasmtime::Error) -> Self {
        Self::Instantiation(format!("{error:#}"))
    }

    pub(crate) fn trap(error: wasmtime::Error) -> Self {
        Self::Trap(format!("{error:#}"))
    }

    pub(crate) fn wire(message: impl Into<String>) -> Self {
        Self::Codec(value::Error::Wire(message.into()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
