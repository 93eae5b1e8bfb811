//! Capability grants for sandboxed guests.
//!
//! Core principle: **a guest only touches the host through capabilities it
//! was explicitly handed.** Randomness and the standard streams can be
//! granted or revoked; environment, preopened directories and the
//! filesystem are withheld from every guest.

mod capability;
mod error;
mod grants;

pub use capability::CapabilityKind;
pub use error::{Error, Result};
pub use grants::{Decision, Grants};
