//! Reflect built-in
//!
//! Reflective meta-operations behind a single dispatch entry point:
//! - `Reflect.get(target, propertyKey, receiver?)`
//! - `Reflect.set(target, propertyKey, value, receiver?)`
//! - `Reflect.has(target, propertyKey)`
//! - `Reflect.deleteProperty(target, propertyKey)`
//! - `Reflect.construct(target, argumentsList, newTarget?)`
//! - `Reflect.ownKeys(target)`
//! - `Reflect.getPrototypeOf(target)`
//! - `Reflect.setPrototypeOf(target, prototype)`
//! - `Reflect.apply(target, thisArgument, argumentsList)`
//! - `Reflect.defineProperty(target, propertyKey, attributes)`
//! - `Reflect.getOwnPropertyDescriptor(target, propertyKey)`
//! - `Reflect.isExtensible(target)`
//! - `Reflect.preventExtensions(target)`
//!
//! The thirteen routines share one dispatcher keyed by [`ReflectOp`]; the
//! routines fall into four validation groups and the order of their
//! precondition checks is part of the observable contract. Two routines
//! (`setPrototypeOf`, `defineProperty`) convert delegate failures into a
//! `false` result and discard the pending exception; the rest propagate
//! delegate errors unchanged.

use marten_vm_core::abstract_ops::{ArrayLikeOps, ObjectOps, PropertyKeyOps};
use marten_vm_core::error::{VmError, VmResult};
use marten_vm_core::object::{JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey};
use marten_vm_core::string::JsString;
use marten_vm_core::value::{NativeFunction, Value};
use marten_vm_core::VmContext;
use std::sync::Arc;

/// Routine identifiers for the Reflect built-in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReflectOp {
    /// ECMA-262 v6, 26.1.6
    Get,
    /// ECMA-262 v6, 26.1.13
    Set,
    /// ECMA-262 v6, 26.1.9
    Has,
    /// ECMA-262 v6, 26.1.4
    DeleteProperty,
    /// ECMA-262 v6, 26.1.2
    Construct,
    /// ECMA-262 v6, 26.1.11
    OwnKeys,
    /// ECMA-262 v6, 26.1.8
    GetPrototypeOf,
    /// ECMA-262 v6, 26.1.14
    SetPrototypeOf,
    /// ECMA-262 v6, 26.1.1
    Apply,
    /// ECMA-262 v6, 26.1.3
    DefineProperty,
    /// ECMA-262 v6, 26.1.7
    GetOwnPropertyDescriptor,
    /// ECMA-262 v6, 26.1.10
    IsExtensible,
    /// ECMA-262 v6, 26.1.12
    PreventExtensions,
}

/// Public routine table for the registration layer: name, identifier, arity
pub const ROUTINES: [(&str, ReflectOp, u32); 13] = [
    ("get", ReflectOp::Get, 2),
    ("set", ReflectOp::Set, 3),
    ("has", ReflectOp::Has, 2),
    ("deleteProperty", ReflectOp::DeleteProperty, 2),
    ("construct", ReflectOp::Construct, 2),
    ("ownKeys", ReflectOp::OwnKeys, 1),
    ("getPrototypeOf", ReflectOp::GetPrototypeOf, 1),
    ("setPrototypeOf", ReflectOp::SetPrototypeOf, 2),
    ("apply", ReflectOp::Apply, 3),
    ("defineProperty", ReflectOp::DefineProperty, 3),
    ("getOwnPropertyDescriptor", ReflectOp::GetOwnPropertyDescriptor, 2),
    ("isExtensible", ReflectOp::IsExtensible, 1),
    ("preventExtensions", ReflectOp::PreventExtensions, 1),
];

/// Dispatcher for the built-in's routines.
///
/// `this_arg` is accepted for signature parity with every other built-in
/// routine and ignored; no Reflect routine observes its receiver.
/// Arguments past the end of `args` read as undefined.
pub fn dispatch<C>(cx: &mut C, op: ReflectOp, this_arg: &Value, args: &[Value]) -> VmResult<Value>
where
    C: ObjectOps + PropertyKeyOps + ArrayLikeOps,
{
    let _ = this_arg;
    match op {
        ReflectOp::Get | ReflectOp::Set | ReflectOp::Has | ReflectOp::DeleteProperty => {
            keyed_op(cx, op, args)
        }
        ReflectOp::OwnKeys => {
            let target = require_object(args)?;
            cx.own_property_keys(&target, true)
        }
        ReflectOp::Construct => construct_op(cx, args),
        ReflectOp::GetPrototypeOf
        | ReflectOp::SetPrototypeOf
        | ReflectOp::Apply
        | ReflectOp::DefineProperty
        | ReflectOp::GetOwnPropertyDescriptor
        | ReflectOp::IsExtensible
        | ReflectOp::PreventExtensions => object_op(cx, op, args),
    }
}

/// Routines keyed by a property name: get, set, has, deleteProperty.
///
/// The object check precedes key coercion; a coercion failure propagates
/// with no key handle live. The handle created here is released when the
/// branch exits, whether the delegate succeeded or not.
fn keyed_op<C>(cx: &mut C, op: ReflectOp, args: &[Value]) -> VmResult<Value>
where
    C: ObjectOps + PropertyKeyOps + ArrayLikeOps,
{
    let target = require_object(args)?;
    let key = cx.to_property_key(&arg(args, 1))?;

    match op {
        ReflectOp::Get => {
            let receiver = if args.len() > 2 {
                args[2].clone()
            } else {
                args[0].clone()
            };
            cx.get_with_receiver(&target, key.key(), &receiver)
        }
        ReflectOp::Has => cx.has_property(&target, key.key()).map(Value::boolean),
        ReflectOp::DeleteProperty => cx.delete_property(&target, key.key()).map(Value::boolean),
        ReflectOp::Set => {
            let receiver = if args.len() > 3 {
                args[3].clone()
            } else {
                args[0].clone()
            };
            cx.set_with_receiver(&target, key.key(), &arg(args, 2), &receiver)
                .map(Value::boolean)
        }
        _ => unreachable!(),
    }
}

/// Reflect.construct: the constructor check of the target runs before the
/// new-target check, which runs before the arity check of the argument
/// list; conformance suites observe this exact order.
fn construct_op<C>(cx: &mut C, args: &[Value]) -> VmResult<Value>
where
    C: ObjectOps + PropertyKeyOps + ArrayLikeOps,
{
    if args.is_empty() || !cx.is_constructor(&args[0]) {
        return Err(VmError::type_error("Target is not a constructor"));
    }
    let target = &args[0];

    let mut new_target = target;
    if args.len() > 2 {
        if !cx.is_constructor(&args[2]) {
            return Err(VmError::type_error("Target is not a constructor"));
        }
        new_target = &args[2];
    }

    if args.len() < 2 {
        return Err(VmError::type_error(
            "Reflect.construct requires the second argument be an object",
        ));
    }

    let buffer = cx.list_from_array_like(&args[1])?;
    cx.construct(target, new_target, &buffer)
    // the argument buffer is freed here on both outcomes of the call
}

/// Routines sharing the single object precondition: getPrototypeOf,
/// setPrototypeOf, apply, defineProperty, getOwnPropertyDescriptor,
/// isExtensible, preventExtensions.
fn object_op<C>(cx: &mut C, op: ReflectOp, args: &[Value]) -> VmResult<Value>
where
    C: ObjectOps + PropertyKeyOps + ArrayLikeOps,
{
    let target = require_object(args)?;

    match op {
        ReflectOp::GetPrototypeOf => cx.get_prototype_of(&target),
        ReflectOp::SetPrototypeOf => {
            // a failed prototype write reports as `false`; the pending
            // exception is dropped and never reaches the caller
            let ok = cx.set_prototype_of(&target, &arg(args, 1)).is_ok();
            Ok(Value::boolean(ok))
        }
        ReflectOp::Apply => {
            if !cx.is_callable(&args[0]) {
                return Err(VmError::type_error("Argument 'this' is not a function"));
            }
            cx.apply(&args[0], &arg(args, 1), &arg(args, 2))
        }
        ReflectOp::DefineProperty => {
            let key = cx.to_property_key(&arg(args, 1))?;
            // same swallow as setPrototypeOf; the key handle is released
            // either way
            let ok = cx
                .define_own_property(&target, key.key(), &arg(args, 2))
                .is_ok();
            Ok(Value::boolean(ok))
        }
        ReflectOp::GetOwnPropertyDescriptor => {
            let key = cx.to_property_key(&arg(args, 1))?;
            cx.get_own_property_descriptor(&target, key.key())
        }
        ReflectOp::IsExtensible => cx.is_extensible(&target).map(Value::boolean),
        ReflectOp::PreventExtensions => cx.prevent_extensions(&target).map(Value::boolean),
        _ => unreachable!(),
    }
}

fn require_object(args: &[Value]) -> VmResult<Arc<JsObject>> {
    args.first()
        .and_then(Value::as_object)
        .ok_or_else(|| VmError::type_error("Argument is not an Object"))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::undefined())
}

/// Create and install the Reflect namespace on a global object.
///
/// Each routine becomes a native function forwarding to [`dispatch`], with
/// standard `name` and `length` properties. Namespace members are
/// writable, non-enumerable, configurable.
pub fn install_reflect_namespace(global: &Arc<JsObject>) {
    let method_attrs = PropertyAttributes {
        writable: true,
        enumerable: false,
        configurable: true,
    };
    let meta_attrs = PropertyAttributes {
        writable: false,
        enumerable: false,
        configurable: true,
    };

    let reflect = Arc::new(JsObject::new(None));
    for (name, op, arity) in ROUTINES {
        let func = Arc::new(JsObject::function(NativeFunction::new(
            move |cx: &mut VmContext, this: &Value, args: &[Value]| dispatch(cx, op, this, args),
        )));
        func.define_raw(
            PropertyKey::string("name"),
            PropertyDescriptor::data_with_attrs(
                Value::string(JsString::intern(name)),
                meta_attrs,
            ),
        );
        func.define_raw(
            PropertyKey::string("length"),
            PropertyDescriptor::data_with_attrs(Value::number(arity as f64), meta_attrs),
        );
        reflect.define_raw(
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(Value::object(func), method_attrs),
        );
    }
    global.define_raw(
        PropertyKey::string("Reflect"),
        PropertyDescriptor::data_with_attrs(Value::object(reflect), method_attrs),
    );
}
