//! Reflect conformance scenarios
//!
//! End-to-end checks through the installed namespace: routine wiring,
//! re-entrant dispatch from accessors, and key-handle hygiene under
//! repeated error paths.

use marten_vm_builtins::reflect::{ReflectOp, dispatch, install_reflect_namespace};
use marten_vm_core::object::{JsObject, PropertyDescriptor, PropertyKey};
use marten_vm_core::string::JsString;
use marten_vm_core::value::{NativeFunction, Value};
use marten_vm_core::{VmContext, VmError, VmResult};
use std::sync::Arc;

fn native(
    f: impl Fn(&mut VmContext, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
) -> Value {
    Value::object(Arc::new(JsObject::function(NativeFunction::new(f))))
}

fn data_value(obj: &Arc<JsObject>, name: &str) -> Value {
    obj.own_property(&PropertyKey::string(name))
        .and_then(|desc| desc.value().cloned())
        .unwrap_or_else(|| panic!("missing property {name}"))
}

fn installed_routine(global: &Arc<JsObject>, name: &str) -> Value {
    let reflect = data_value(global, "Reflect")
        .as_object()
        .expect("Reflect namespace object");
    data_value(&reflect, name)
}

#[test]
fn test_namespace_exposes_all_routines_with_arities() {
    let global = Arc::new(JsObject::new(None));
    install_reflect_namespace(&global);

    let reflect = data_value(&global, "Reflect").as_object().unwrap();
    for (name, arity) in [
        ("get", 2.0),
        ("set", 3.0),
        ("has", 2.0),
        ("deleteProperty", 2.0),
        ("construct", 2.0),
        ("ownKeys", 1.0),
        ("getPrototypeOf", 1.0),
        ("setPrototypeOf", 2.0),
        ("apply", 3.0),
        ("defineProperty", 3.0),
        ("getOwnPropertyDescriptor", 2.0),
        ("isExtensible", 1.0),
        ("preventExtensions", 1.0),
    ] {
        let routine = data_value(&reflect, name).as_object().unwrap();
        assert!(routine.is_callable(), "{name} is callable");
        assert_eq!(
            data_value(&routine, "length"),
            Value::number(arity),
            "{name} arity"
        );
        assert_eq!(
            data_value(&routine, "name"),
            Value::string(JsString::intern(name)),
            "{name} name"
        );
    }
}

#[test]
fn test_get_and_set_through_installed_namespace() {
    let mut cx = VmContext::new();
    let global = Arc::new(JsObject::new(None));
    install_reflect_namespace(&global);

    let target = Arc::new(JsObject::new(None));
    let set = installed_routine(&global, "set");
    let get = installed_routine(&global, "get");

    let ok = cx
        .call_function(
            &set,
            &Value::undefined(),
            &[
                Value::object(target.clone()),
                Value::string(JsString::intern("answer")),
                Value::number(42.0),
            ],
        )
        .unwrap();
    assert_eq!(ok, Value::boolean(true));

    let got = cx
        .call_function(
            &get,
            &Value::undefined(),
            &[
                Value::object(target),
                Value::string(JsString::intern("answer")),
            ],
        )
        .unwrap();
    assert_eq!(got, Value::number(42.0));
}

#[test]
fn test_getter_may_reenter_the_dispatcher() {
    let mut cx = VmContext::new();
    let inner = Arc::new(JsObject::new(None));
    inner.define_raw(
        PropertyKey::string("deep"),
        PropertyDescriptor::data(Value::number(7.0)),
    );

    let outer = Arc::new(JsObject::new(None));
    outer.define_raw(
        PropertyKey::string("relay"),
        PropertyDescriptor::accessor(
            Some(native({
                let inner = inner.clone();
                move |cx, _, _| {
                    dispatch(
                        cx,
                        ReflectOp::Get,
                        &Value::undefined(),
                        &[
                            Value::object(inner.clone()),
                            Value::string(JsString::intern("deep")),
                        ],
                    )
                }
            })),
            None,
            marten_vm_core::PropertyAttributes::data(),
        ),
    );

    let got = dispatch(
        &mut cx,
        ReflectOp::Get,
        &Value::undefined(),
        &[
            Value::object(outer),
            Value::string(JsString::intern("relay")),
        ],
    )
    .unwrap();
    assert_eq!(got, Value::number(7.0));
    assert_eq!(cx.live_key_handles(), 0);
}

#[test]
fn test_repeated_throwing_getters_leak_no_key_handles() {
    let mut cx = VmContext::new();
    let target = Arc::new(JsObject::new(None));
    target.define_raw(
        PropertyKey::string("boom"),
        PropertyDescriptor::accessor(
            Some(native(|_, _, _| {
                Err(VmError::exception(Value::string(JsString::intern(
                    "getter failure",
                ))))
            })),
            None,
            marten_vm_core::PropertyAttributes::data(),
        ),
    );

    let baseline = cx.live_key_handles();
    for _ in 0..1000 {
        let result = dispatch(
            &mut cx,
            ReflectOp::Get,
            &Value::undefined(),
            &[
                Value::object(target.clone()),
                Value::string(JsString::intern("boom")),
            ],
        );
        assert!(result.is_err());
        assert_eq!(cx.live_key_handles(), baseline);
    }
}

#[test]
fn test_construct_through_installed_namespace() {
    let mut cx = VmContext::new();
    let global = Arc::new(JsObject::new(None));
    install_reflect_namespace(&global);
    let construct = installed_routine(&global, "construct");

    let ctor = Value::object(Arc::new(JsObject::function(NativeFunction::constructor(
        |_, this, args| {
            let obj = this.as_object().expect("instance object");
            obj.define_raw(
                PropertyKey::string("first"),
                PropertyDescriptor::data(args.first().cloned().unwrap_or(Value::undefined())),
            );
            Ok(Value::undefined())
        },
    ))));
    let args_list = Value::object(Arc::new(JsObject::array_from(vec![Value::number(9.0)])));

    // explicit new-target is validated and accepted
    let instance = cx
        .call_function(
            &construct,
            &Value::undefined(),
            &[ctor.clone(), args_list, ctor.clone()],
        )
        .unwrap();
    let obj = instance.as_object().unwrap();
    assert_eq!(
        obj.own_property(&PropertyKey::string("first"))
            .unwrap()
            .value(),
        Some(&Value::number(9.0))
    );

    // a throwing constructor propagates and frees the argument buffer
    let throwing = Value::object(Arc::new(JsObject::function(NativeFunction::constructor(
        |_, _, _| Err(VmError::exception(Value::string(JsString::intern("halt")))),
    ))));
    let args_list = Value::object(Arc::new(JsObject::array_from(vec![Value::number(1.0)])));
    let result = cx.call_function(&construct, &Value::undefined(), &[throwing, args_list]);
    assert!(matches!(result, Err(VmError::Exception(_))));
}

#[test]
fn test_own_keys_of_array_lists_indices_then_length() {
    let mut cx = VmContext::new();
    let arr = Arc::new(JsObject::array_from(vec![
        Value::number(10.0),
        Value::number(20.0),
    ]));

    let keys = dispatch(
        &mut cx,
        ReflectOp::OwnKeys,
        &Value::undefined(),
        &[Value::object(arr)],
    )
    .unwrap();
    let keys = keys.as_object().unwrap();
    assert_eq!(keys.array_length(), 3);
    assert_eq!(keys.element(0).unwrap(), Value::string(JsString::intern("0")));
    assert_eq!(keys.element(1).unwrap(), Value::string(JsString::intern("1")));
    assert_eq!(
        keys.element(2).unwrap(),
        Value::string(JsString::intern("length"))
    );
}

#[test]
fn test_delete_through_installed_namespace() {
    let mut cx = VmContext::new();
    let global = Arc::new(JsObject::new(None));
    install_reflect_namespace(&global);
    let delete = installed_routine(&global, "deleteProperty");

    let target = Arc::new(JsObject::new(None));
    target.define_raw(
        PropertyKey::string("temp"),
        PropertyDescriptor::data(Value::number(1.0)),
    );

    let ok = cx
        .call_function(
            &delete,
            &Value::undefined(),
            &[
                Value::object(target.clone()),
                Value::string(JsString::intern("temp")),
            ],
        )
        .unwrap();
    assert_eq!(ok, Value::boolean(true));
    assert!(!target.has_own(&PropertyKey::string("temp")));
}
