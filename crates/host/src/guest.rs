//! The seams between the driver and a concrete guest.

use value::{EvaluationRequest, EvaluationResultContext};

use crate::{CapabilityProvider, Result};

/// A loaded guest that can be instantiated against a provider.
pub trait GuestComponent {
    type Instance: GuestInstance;

    /// Instantiate the guest, moving the provider into its store.
    fn instantiate(&self, provider: CapabilityProvider) -> Result<Self::Instance>;
}

/// An instantiated guest whose exports have not been resolved yet.
pub trait GuestInstance {
    type Exports: GuestExports;

    /// Resolve the exports the driver calls. A missing export is
    /// [`Error::Binding`](crate::Error::Binding).
    fn bind(self) -> Result<Self::Exports>;
}

/// The resolved entry points of a guest.
pub trait GuestExports {
    fn version(&mut self) -> Result<String>;

    /// Call `eval` once.
    ///
    /// `Err` is a host-side failure (trap, malformed result). `Ok(Err(_))`
    /// carries the guest's own failure message.
    fn eval(
        &mut self,
        request: &EvaluationRequest,
    ) -> Result<std::result::Result<EvaluationResultContext, String>>;
}
