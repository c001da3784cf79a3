//! Collaborator contracts for the reflective meta-operation layer
//!
//! The reflective dispatcher delegates every actual object inspection or
//! mutation through these three traits; it never reaches into property
//! storage itself. [`crate::context::VmContext`] is the engine's
//! implementation; tests substitute their own to observe exactly which
//! delegate calls a dispatch performs.

use crate::error::VmResult;
use crate::object::{JsObject, PropertyKey, PropertyKeyHandle};
use crate::value::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Materialized argument buffer built from an array-like value.
///
/// Owned by the borrowing call frame and freed on scope exit, on success
/// and error paths alike.
pub type ArgumentBuffer = SmallVec<[Value; 8]>;

/// Generic object abstract operations (the object model facade).
///
/// `Value` results are returned as the delegate produced them; boolean
/// results are plain `bool` and the caller decides their value
/// representation. Errors carry the pending exception.
pub trait ObjectOps {
    /// Read a property, evaluating accessors against `receiver`
    fn get_with_receiver(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value>;

    /// Write a property, evaluating accessors against `receiver`
    fn set_with_receiver(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        value: &Value,
        receiver: &Value,
    ) -> VmResult<bool>;

    /// Test property existence along the prototype chain
    fn has_property(&mut self, target: &Arc<JsObject>, key: &PropertyKey) -> VmResult<bool>;

    /// Remove an own property; `false` for non-configurable properties
    fn delete_property(&mut self, target: &Arc<JsObject>, key: &PropertyKey) -> VmResult<bool>;

    /// Enumerate own keys as an array value: index keys ascending, then
    /// string keys in insertion order, then symbol keys in insertion order
    fn own_property_keys(
        &mut self,
        target: &Arc<JsObject>,
        include_symbols: bool,
    ) -> VmResult<Value>;

    /// Read the prototype link (an object or null)
    fn get_prototype_of(&mut self, target: &Arc<JsObject>) -> VmResult<Value>;

    /// Replace the prototype link; may error
    fn set_prototype_of(&mut self, target: &Arc<JsObject>, proto: &Value) -> VmResult<Value>;

    /// Invoke a callable with an explicit receiver and array-like arguments
    fn apply(&mut self, func: &Value, this_arg: &Value, args_array_like: &Value)
    -> VmResult<Value>;

    /// Define an own property from a descriptor-like object; may error
    fn define_own_property(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        descriptor: &Value,
    ) -> VmResult<Value>;

    /// Read an own property descriptor as an object value, or undefined
    fn get_own_property_descriptor(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
    ) -> VmResult<Value>;

    /// Test whether new own properties may be added
    fn is_extensible(&mut self, target: &Arc<JsObject>) -> VmResult<bool>;

    /// Clear the extensibility flag
    fn prevent_extensions(&mut self, target: &Arc<JsObject>) -> VmResult<bool>;

    /// Invoke a constructor with an explicit new-target
    fn construct(&mut self, target: &Value, new_target: &Value, args: &[Value])
    -> VmResult<Value>;

    /// Pure predicate: does the value support construct invocation
    fn is_constructor(&self, value: &Value) -> bool;

    /// Pure predicate: is the value callable
    fn is_callable(&self, value: &Value) -> bool;
}

/// Property-key coercion.
pub trait PropertyKeyOps {
    /// Coerce a value to an owned property-key handle; errors leave no
    /// handle behind
    fn to_property_key(&mut self, value: &Value) -> VmResult<PropertyKeyHandle>;
}

/// Array-like materialization.
pub trait ArrayLikeOps {
    /// Build an owned argument buffer from an array-like value
    fn list_from_array_like(&mut self, value: &Value) -> VmResult<ArgumentBuffer>;
}
