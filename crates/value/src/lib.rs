//! Structured values exchanged with a sandboxed policy engine.
//!
//! This crate is the value half of the host/guest boundary. It knows nothing
//! about WebAssembly; it defines what crosses the boundary and how recursive
//! data is carried over a calling convention without recursive types.
//!
//! # Core Concepts
//!
//! ## StructuredValue
//!
//! [`StructuredValue`] is a closed, recursive sum type over null, booleans,
//! integers, decimals, strings, octets, lists and [`Object`]s. Objects keep
//! their fields in insertion order, since the order of output and rationale
//! fields is observable.
//!
//! ## FlatValue
//!
//! A [`FlatValue`] is the wire form of a structured value: a post-order node
//! table where children are referenced by index. Decoding is bottom-up and
//! rejects forward references, cycles and shared nodes.
//!
//! ## Schemas
//!
//! [`Pattern`] and [`Rationale`] are typed views over structured values
//! returned by the guest. Each converts to a [`StructuredValue`] with `From`
//! and back with `TryFrom`.
//!
//! # Example
//!
//! ```
//! use value::{FlatValue, Object, StructuredValue};
//!
//! let input: StructuredValue = Object::new()
//!     .with("name", "goodboy")
//!     .with("trained", true)
//!     .into();
//!
//! let flat = FlatValue::from(&input);
//! assert_eq!(flat.unflatten()?, input);
//! # Ok::<(), value::Error>(())
//! ```

mod error;
mod evaluation;
mod flat;
mod json;
mod pattern;
mod rationale;
mod schema;
mod value;

pub use error::{Error, Result};
pub use evaluation::{EncodedResult, EvaluationRequest, EvaluationResultContext};
pub use flat::{FlatValue, MAX_DEPTH, Node};
pub use pattern::{Field, InnerPattern, Pattern, Primordial};
pub use rationale::{Rationale, Severity, Violation};
pub use value::{Object, StructuredValue};
