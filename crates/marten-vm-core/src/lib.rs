//! # Marten VM Core
//!
//! Core value model and engine context for the Marten script runtime.
//!
//! ## Design Principles
//!
//! - **Thread-safe**: values are `Send + Sync`; heap payloads sit behind `Arc`
//! - **Insertion-ordered properties**: own-key enumeration is deterministic
//! - **Traits at the seams**: the reflective layer consumes the
//!   [`abstract_ops`] traits, never the storage types directly

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod abstract_ops;
pub mod context;
pub mod error;
pub mod object;
pub mod string;
pub mod value;

pub use abstract_ops::{ArgumentBuffer, ArrayLikeOps, ObjectOps, PropertyKeyOps};
pub use context::VmContext;
pub use error::{VmError, VmResult};
pub use object::{
    JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey, PropertyKeyHandle,
};
pub use string::JsString;
pub use value::{NativeFn, NativeFunction, Symbol, Value};
