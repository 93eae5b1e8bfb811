//! Host harness for a sandboxed policy engine.
//!
//! The guest is a WebAssembly component that evaluates policies. It is
//! untrusted: everything it can reach on the host goes through a
//! [`CapabilityProvider`] built before instantiation and moved into the
//! guest's store.
//!
//! # Overview
//!
//! - **StreamRegistry**: stable handles for stdin, stdout and stderr.
//! - **CapabilityProvider**: randomness and the standard streams; an empty
//!   environment, no preopened directories, and a filesystem that refuses
//!   every call with [`Error::CapabilityNotGranted`].
//! - **Driver**: an explicit phase machine that instantiates the guest,
//!   binds its exports and makes exactly one `eval` call.
//! - **marshal**: lowers [`value`] types to component values and back.
//!
//! # Example
//!
//! ```no_run
//! use host::{CapabilityProvider, Driver, WasmComponent};
//! use value::{EvaluationRequest, Object};
//!
//! # fn example() -> host::Result<()> {
//! let component = WasmComponent::from_file("engine.wasm")?;
//! let input = Object::new().with("name", "goodboy").with("trained", true);
//! let request = EvaluationRequest::new(
//!     "pattern dog = { name: string, trained: boolean }",
//!     "dog",
//!     input,
//! );
//!
//! let result = Driver::run(component, CapabilityProvider::least_privilege(), &request)?;
//! assert!(result.satisfied());
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
mod component;
mod driver;
mod error;
mod guest;
pub mod linker;
pub mod marshal;
mod provider;
mod streams;

pub use capabilities::{Descriptor, DescriptorType};
pub use component::{ENGINE_INTERFACE, WasmComponent, WasmExports, WasmInstance};
pub use driver::{Driver, Phase};
pub use error::{Error, Result};
pub use guest::{GuestComponent, GuestExports, GuestInstance};
pub use provider::{CapabilityProvider, CapabilityProviderBuilder};
pub use streams::{SharedBuffer, StreamHandle, StreamKind, StreamRegistry};
