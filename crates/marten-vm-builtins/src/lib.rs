//! Built-in objects and functions for Marten VM
//!
//! This crate provides the runtime's built-in namespaces:
//! - `Reflect` - reflective meta-operations for metaprogramming
//!
//! Each built-in module exposes its routine table for the registration
//! layer plus an installer that materializes the namespace object.

#![warn(clippy::all)]

pub mod reflect;

pub use reflect::{ReflectOp, dispatch, install_reflect_namespace};
