//! Engine execution context
//!
//! `VmContext` implements the collaborator traits of
//! [`crate::abstract_ops`] over the in-memory object model: the
//! receiver-honoring get/set walks, descriptor conversion in both
//! directions, prototype-link rules, property-key coercion, and array-like
//! materialization. Native functions receive the context back, so a getter
//! or setter may re-enter any higher layer synchronously; the only state
//! shared between nested calls is the call-depth counter.

use crate::abstract_ops::{ArgumentBuffer, ArrayLikeOps, ObjectOps, PropertyKeyOps};
use crate::error::{VmError, VmResult};
use crate::object::{
    JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey, PropertyKeyHandle,
};
use crate::string::{JsString, well_known};
use crate::value::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Nesting limit for native call frames. Recursion past this limit reports
/// the engine's stack-overflow error instead of exhausting the host stack.
pub const MAX_CALL_DEPTH: usize = 128;

/// Upper bound on a materialized argument list.
pub const MAX_ARGUMENT_COUNT: u64 = 65535;

/// The engine context
pub struct VmContext {
    depth: usize,
    key_handles: Arc<AtomicUsize>,
}

impl VmContext {
    /// Create a fresh context
    pub fn new() -> Self {
        Self {
            depth: 0,
            key_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of property-key handles currently alive in this context
    pub fn live_key_handles(&self) -> usize {
        self.key_handles.load(Ordering::Relaxed)
    }

    /// Invoke a callable value with an explicit receiver
    pub fn call_function(
        &mut self,
        func: &Value,
        this_arg: &Value,
        args: &[Value],
    ) -> VmResult<Value> {
        let native = func
            .as_object()
            .and_then(|o| o.call_slot().cloned())
            .ok_or_else(|| VmError::type_error("Value is not a function"))?;
        if self.depth >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow);
        }
        self.depth += 1;
        let result = (native.func)(self, this_arg, args);
        self.depth -= 1;
        result
    }

    /// Find the closest descriptor for `key` along the prototype chain
    fn chain_property(
        &self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
    ) -> Option<PropertyDescriptor> {
        let mut current = Arc::clone(target);
        loop {
            if let Some(desc) = current.own_property(key) {
                return Some(desc);
            }
            current = current.prototype()?;
        }
    }

    fn descriptor_field(
        &mut self,
        obj: &Arc<JsObject>,
        holder: &Value,
        name: &Arc<JsString>,
    ) -> VmResult<Option<Value>> {
        let key = PropertyKey::String(name.clone());
        if self.has_property(obj, &key)? {
            Ok(Some(self.get_with_receiver(obj, &key, holder)?))
        } else {
            Ok(None)
        }
    }

    /// Convert a descriptor-like object into a property descriptor
    fn to_property_descriptor(&mut self, value: &Value) -> VmResult<PropertyDescriptor> {
        let Some(obj) = value.as_object() else {
            return Err(VmError::type_error("Property description must be an object"));
        };

        let enumerable = self
            .descriptor_field(&obj, value, &well_known::ENUMERABLE)?
            .is_some_and(|v| v.to_boolean());
        let configurable = self
            .descriptor_field(&obj, value, &well_known::CONFIGURABLE)?
            .is_some_and(|v| v.to_boolean());
        let writable_field = self.descriptor_field(&obj, value, &well_known::WRITABLE)?;
        let value_field = self.descriptor_field(&obj, value, &well_known::VALUE)?;
        let get_field = self.descriptor_field(&obj, value, &well_known::GET)?;
        let set_field = self.descriptor_field(&obj, value, &well_known::SET)?;

        if let Some(g) = &get_field
            && !g.is_undefined()
            && !self.is_callable(g)
        {
            return Err(VmError::type_error("Getter is not callable"));
        }
        if let Some(s) = &set_field
            && !s.is_undefined()
            && !self.is_callable(s)
        {
            return Err(VmError::type_error("Setter is not callable"));
        }

        if get_field.is_some() || set_field.is_some() {
            if value_field.is_some() || writable_field.is_some() {
                return Err(VmError::type_error(
                    "Property descriptors must not specify a value or writability when a getter or setter has been specified",
                ));
            }
            return Ok(PropertyDescriptor::accessor(
                get_field.filter(|v| !v.is_undefined()),
                set_field.filter(|v| !v.is_undefined()),
                PropertyAttributes {
                    writable: false,
                    enumerable,
                    configurable,
                },
            ));
        }

        Ok(PropertyDescriptor::data_with_attrs(
            value_field.unwrap_or(Value::undefined()),
            PropertyAttributes {
                writable: writable_field.is_some_and(|v| v.to_boolean()),
                enumerable,
                configurable,
            },
        ))
    }

    /// Build a descriptor-like object from a property descriptor
    fn from_property_descriptor(&self, desc: &PropertyDescriptor) -> Value {
        let obj = Arc::new(JsObject::new(None));
        let field = |name: &Arc<JsString>, value: Value| {
            obj.define_raw(
                PropertyKey::String(name.clone()),
                PropertyDescriptor::data(value),
            );
        };
        match desc {
            PropertyDescriptor::Data { value, attributes } => {
                field(&well_known::VALUE, value.clone());
                field(&well_known::WRITABLE, Value::boolean(attributes.writable));
                field(&well_known::ENUMERABLE, Value::boolean(attributes.enumerable));
                field(
                    &well_known::CONFIGURABLE,
                    Value::boolean(attributes.configurable),
                );
            }
            PropertyDescriptor::Accessor {
                get,
                set,
                attributes,
            } => {
                field(&well_known::GET, get.clone().unwrap_or(Value::undefined()));
                field(&well_known::SET, set.clone().unwrap_or(Value::undefined()));
                field(&well_known::ENUMERABLE, Value::boolean(attributes.enumerable));
                field(
                    &well_known::CONFIGURABLE,
                    Value::boolean(attributes.configurable),
                );
            }
        }
        Value::object(obj)
    }

    /// Ordinary define with full validity checks; errors on an invalid
    /// transition so the caller decides whether the error is observable
    fn ordinary_define(
        &self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> VmResult<()> {
        let Some(current) = target.own_property(key) else {
            if !target.is_extensible() {
                return Err(VmError::type_error(
                    "Cannot define a property on a non-extensible object",
                ));
            }
            target.define_raw(key.clone(), desc);
            return Ok(());
        };

        let cur_attrs = current.attributes();
        if cur_attrs.configurable {
            target.define_raw(key.clone(), desc);
            return Ok(());
        }

        let new_attrs = desc.attributes();
        if new_attrs.configurable || new_attrs.enumerable != cur_attrs.enumerable {
            return Err(VmError::type_error(
                "Cannot redefine a non-configurable property",
            ));
        }
        match (&current, &desc) {
            (
                PropertyDescriptor::Data { value: cur, .. },
                PropertyDescriptor::Data { value: new, .. },
            ) => {
                if !cur_attrs.writable && (new_attrs.writable || new != cur) {
                    return Err(VmError::type_error(
                        "Cannot redefine a non-configurable property",
                    ));
                }
            }
            (
                PropertyDescriptor::Accessor {
                    get: cur_get,
                    set: cur_set,
                    ..
                },
                PropertyDescriptor::Accessor {
                    get: new_get,
                    set: new_set,
                    ..
                },
            ) => {
                if cur_get != new_get || cur_set != new_set {
                    return Err(VmError::type_error(
                        "Cannot redefine a non-configurable property",
                    ));
                }
            }
            _ => {
                return Err(VmError::type_error(
                    "Cannot redefine a non-configurable property",
                ));
            }
        }
        target.define_raw(key.clone(), desc);
        Ok(())
    }

    /// Convert a primitive value into a property key
    fn primitive_to_key(&self, value: &Value) -> VmResult<PropertyKey> {
        match value {
            Value::String(s) => Ok(string_to_key(s.clone())),
            Value::Symbol(s) => Ok(PropertyKey::Symbol(s.clone())),
            Value::Number(n) => Ok(number_to_key(*n)),
            Value::Boolean(true) => Ok(PropertyKey::String(well_known::TRUE.clone())),
            Value::Boolean(false) => Ok(PropertyKey::String(well_known::FALSE.clone())),
            Value::Undefined => Ok(PropertyKey::String(well_known::UNDEFINED.clone())),
            Value::Null => Ok(PropertyKey::String(well_known::NULL.clone())),
            Value::Object(_) => Err(VmError::type_error(
                "Cannot convert an object to a property key",
            )),
        }
    }

    /// Coerce an array-like length value
    fn to_length(&self, value: &Value) -> VmResult<u64> {
        let n = match value {
            Value::Number(n) => *n,
            Value::Undefined | Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => s.as_str().trim().parse::<f64>().unwrap_or(f64::NAN),
            Value::Symbol(_) | Value::Object(_) => {
                return Err(VmError::type_error("Invalid array-like length"));
            }
        };
        if n.is_nan() || n <= 0.0 {
            return Ok(0);
        }
        Ok(n.min(9_007_199_254_740_991.0) as u64)
    }
}

impl Default for VmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectOps for VmContext {
    fn get_with_receiver(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value> {
        match self.chain_property(target, key) {
            Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
            Some(PropertyDescriptor::Accessor { get: Some(getter), .. }) => {
                self.call_function(&getter, receiver, &[])
            }
            Some(PropertyDescriptor::Accessor { get: None, .. }) | None => {
                Ok(Value::undefined())
            }
        }
    }

    fn set_with_receiver(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        value: &Value,
        receiver: &Value,
    ) -> VmResult<bool> {
        match self.chain_property(target, key) {
            Some(PropertyDescriptor::Accessor { set: Some(setter), .. }) => {
                self.call_function(&setter, receiver, &[value.clone()])?;
                Ok(true)
            }
            Some(PropertyDescriptor::Accessor { set: None, .. }) => Ok(false),
            Some(PropertyDescriptor::Data { attributes, .. }) if !attributes.writable => {
                Ok(false)
            }
            _ => {
                // writable data property somewhere on the chain, or absent:
                // the write lands as an own data property of the receiver
                let Some(recv) = receiver.as_object() else {
                    return Ok(false);
                };
                match recv.own_property(key) {
                    Some(PropertyDescriptor::Data { attributes, .. }) => {
                        if !attributes.writable {
                            return Ok(false);
                        }
                        recv.define_raw(
                            key.clone(),
                            PropertyDescriptor::data_with_attrs(value.clone(), attributes),
                        );
                        Ok(true)
                    }
                    Some(PropertyDescriptor::Accessor { .. }) => Ok(false),
                    None => {
                        if !recv.is_extensible() {
                            return Ok(false);
                        }
                        recv.define_raw(key.clone(), PropertyDescriptor::data(value.clone()));
                        Ok(true)
                    }
                }
            }
        }
    }

    fn has_property(&mut self, target: &Arc<JsObject>, key: &PropertyKey) -> VmResult<bool> {
        Ok(self.chain_property(target, key).is_some())
    }

    fn delete_property(&mut self, target: &Arc<JsObject>, key: &PropertyKey) -> VmResult<bool> {
        match target.own_property(key) {
            Some(desc) if !desc.attributes().configurable => Ok(false),
            Some(_) => {
                target.remove_own(key);
                Ok(true)
            }
            None => Ok(true),
        }
    }

    fn own_property_keys(
        &mut self,
        target: &Arc<JsObject>,
        include_symbols: bool,
    ) -> VmResult<Value> {
        let mut indices = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in target.own_keys() {
            match key {
                PropertyKey::Index(i) => indices.push(i),
                PropertyKey::String(s) => strings.push(s),
                PropertyKey::Symbol(s) => symbols.push(s),
            }
        }
        indices.sort_unstable();

        let mut keys = Vec::with_capacity(indices.len() + strings.len() + symbols.len());
        keys.extend(
            indices
                .into_iter()
                .map(|i| Value::string(JsString::intern(&i.to_string()))),
        );
        keys.extend(strings.into_iter().map(Value::string));
        if include_symbols {
            keys.extend(symbols.into_iter().map(Value::symbol));
        }
        Ok(Value::object(Arc::new(JsObject::array_from(keys))))
    }

    fn get_prototype_of(&mut self, target: &Arc<JsObject>) -> VmResult<Value> {
        Ok(target
            .prototype()
            .map(Value::object)
            .unwrap_or(Value::null()))
    }

    fn set_prototype_of(&mut self, target: &Arc<JsObject>, proto: &Value) -> VmResult<Value> {
        let new_proto = match proto {
            Value::Null => None,
            Value::Object(o) => Some(o.clone()),
            _ => {
                return Err(VmError::type_error("Prototype must be an object or null"));
            }
        };

        let unchanged = match (target.prototype(), &new_proto) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(&a, b),
            _ => false,
        };
        if unchanged {
            return Ok(Value::boolean(true));
        }
        if !target.is_extensible() {
            return Err(VmError::type_error(
                "Cannot set the prototype of a non-extensible object",
            ));
        }
        let mut walker = new_proto.clone();
        while let Some(p) = walker {
            if Arc::ptr_eq(&p, target) {
                return Err(VmError::type_error("Prototype chain cycle detected"));
            }
            walker = p.prototype();
        }
        target.set_prototype_raw(new_proto);
        Ok(Value::boolean(true))
    }

    fn apply(
        &mut self,
        func: &Value,
        this_arg: &Value,
        args_array_like: &Value,
    ) -> VmResult<Value> {
        let buffer = self.list_from_array_like(args_array_like)?;
        self.call_function(func, this_arg, &buffer)
    }

    fn define_own_property(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
        descriptor: &Value,
    ) -> VmResult<Value> {
        let desc = self.to_property_descriptor(descriptor)?;
        self.ordinary_define(target, key, desc)?;
        Ok(Value::boolean(true))
    }

    fn get_own_property_descriptor(
        &mut self,
        target: &Arc<JsObject>,
        key: &PropertyKey,
    ) -> VmResult<Value> {
        match target.own_property(key) {
            Some(desc) => Ok(self.from_property_descriptor(&desc)),
            None => Ok(Value::undefined()),
        }
    }

    fn is_extensible(&mut self, target: &Arc<JsObject>) -> VmResult<bool> {
        Ok(target.is_extensible())
    }

    fn prevent_extensions(&mut self, target: &Arc<JsObject>) -> VmResult<bool> {
        target.prevent_extensions();
        Ok(true)
    }

    fn construct(
        &mut self,
        target: &Value,
        new_target: &Value,
        args: &[Value],
    ) -> VmResult<Value> {
        // new-target is validated by the caller but does not drive prototype
        // selection; the instance prototype comes from the target
        let _ = new_target;
        let Some(ctor) = target.as_object() else {
            return Err(VmError::type_error("Target is not a constructor"));
        };
        let proto = self
            .get_with_receiver(
                &ctor,
                &PropertyKey::String(well_known::PROTOTYPE.clone()),
                target,
            )?
            .as_object();
        let this_val = Value::object(Arc::new(JsObject::new(proto)));
        let result = self.call_function(target, &this_val, args)?;
        Ok(if result.is_object() { result } else { this_val })
    }

    fn is_constructor(&self, value: &Value) -> bool {
        value.as_object().is_some_and(|o| o.is_constructor())
    }

    fn is_callable(&self, value: &Value) -> bool {
        value.as_object().is_some_and(|o| o.is_callable())
    }
}

impl PropertyKeyOps for VmContext {
    fn to_property_key(&mut self, value: &Value) -> VmResult<PropertyKeyHandle> {
        let key = match value {
            Value::Object(obj) => {
                let to_string = self.get_with_receiver(
                    obj,
                    &PropertyKey::String(well_known::TO_STRING.clone()),
                    value,
                )?;
                if !self.is_callable(&to_string) {
                    return Err(VmError::type_error(
                        "Cannot convert an object to a property key",
                    ));
                }
                let primitive = self.call_function(&to_string, value, &[])?;
                if primitive.is_object() {
                    return Err(VmError::type_error(
                        "Cannot convert an object to a property key",
                    ));
                }
                self.primitive_to_key(&primitive)?
            }
            _ => self.primitive_to_key(value)?,
        };
        Ok(PropertyKeyHandle::new(key, self.key_handles.clone()))
    }
}

impl ArrayLikeOps for VmContext {
    fn list_from_array_like(&mut self, value: &Value) -> VmResult<ArgumentBuffer> {
        let Some(obj) = value.as_object() else {
            return Err(VmError::type_error("Argument is not an array-like object"));
        };
        let len_value = self.get_with_receiver(
            &obj,
            &PropertyKey::String(well_known::LENGTH.clone()),
            value,
        )?;
        let len = self.to_length(&len_value)?;
        if len > MAX_ARGUMENT_COUNT {
            return Err(VmError::range_error("Too many arguments"));
        }

        let mut buffer = ArgumentBuffer::new();
        for i in 0..len as u32 {
            buffer.push(self.get_with_receiver(&obj, &PropertyKey::Index(i), value)?);
        }
        Ok(buffer)
    }
}

/// Canonical numeric strings collapse to index keys
fn string_to_key(s: Arc<JsString>) -> PropertyKey {
    if let Ok(index) = s.as_str().parse::<u32>()
        && index.to_string() == s.as_str()
    {
        return PropertyKey::Index(index);
    }
    PropertyKey::String(s)
}

fn number_to_key(n: f64) -> PropertyKey {
    if n.fract() == 0.0 && !n.is_infinite() {
        if (0.0..=u32::MAX as f64).contains(&n) {
            return PropertyKey::Index(n as u32);
        }
        if n.abs() <= 9_007_199_254_740_992.0 {
            return PropertyKey::String(JsString::intern(&(n as i64).to_string()));
        }
    }
    let mut buffer = ryu::Buffer::new();
    let formatted = if n.is_nan() {
        "NaN"
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }
    } else {
        buffer.format(n)
    };
    PropertyKey::String(JsString::intern(formatted))
}
