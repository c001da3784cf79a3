//! Script objects
//!
//! `JsObject` is the storage layer only: an insertion-ordered property
//! table, a dense element store for arrays, a mutable prototype link, an
//! extensibility flag, and an optional native call slot. The language-level
//! algorithms (prototype-chain walks, receiver-honoring get/set, descriptor
//! validation) live in [`crate::context::VmContext`].

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::string::{JsString, well_known};
use crate::value::{NativeFunction, Symbol, Value};

/// Property key (string, symbol, or array index)
#[derive(Clone, Debug)]
pub enum PropertyKey {
    /// String property key
    String(Arc<JsString>),
    /// Symbol property key
    Symbol(Arc<Symbol>),
    /// Integer index (for arrays)
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key
    pub fn string(s: &str) -> Self {
        Self::String(JsString::intern(s))
    }

    /// Create from a string Arc
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        Self::String(s)
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl PartialEq for PropertyKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a.id == b.id,
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyKey {}

impl std::hash::Hash for PropertyKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::String(s) => {
                0u8.hash(state);
                s.hash_value().hash(state);
            }
            Self::Symbol(s) => {
                1u8.hash(state);
                s.id.hash(state);
            }
            Self::Index(i) => {
                2u8.hash(state);
                i.hash(state);
            }
        }
    }
}

/// A transient, exclusively owned property-key handle.
///
/// Produced by key coercion; the live-handle counter it holds is
/// decremented exactly once when the handle drops, on success and error
/// paths alike. Not `Clone`: each dispatch frame owns at most one.
pub struct PropertyKeyHandle {
    key: PropertyKey,
    live: Arc<AtomicUsize>,
}

impl PropertyKeyHandle {
    /// Register a freshly coerced key against a live-handle counter
    pub fn new(key: PropertyKey, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::Relaxed);
        Self { key, live }
    }

    /// Borrow the underlying key
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }
}

impl Drop for PropertyKeyHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

impl std::ops::Deref for PropertyKeyHandle {
    type Target = PropertyKey;

    fn deref(&self) -> &PropertyKey {
        &self.key
    }
}

impl std::fmt::Debug for PropertyKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PropertyKeyHandle({:?})", self.key)
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Property is writable
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default data property attributes
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}

/// Property descriptor
#[derive(Clone, Debug)]
pub enum PropertyDescriptor {
    /// Data property
    Data {
        /// The value
        value: Value,
        /// Attributes
        attributes: PropertyAttributes,
    },
    /// Accessor property
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
        /// Attributes
        attributes: PropertyAttributes,
    },
}

impl PropertyDescriptor {
    /// Create a data property with default attributes
    pub fn data(value: Value) -> Self {
        Self::Data {
            value,
            attributes: PropertyAttributes::data(),
        }
    }

    /// Create a data property with specific attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self::Data { value, attributes }
    }

    /// Create an accessor property
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: PropertyAttributes) -> Self {
        Self::Accessor {
            get,
            set,
            attributes,
        }
    }

    /// Get the value (for data properties)
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    /// Get the attributes
    pub fn attributes(&self) -> PropertyAttributes {
        match self {
            Self::Data { attributes, .. } | Self::Accessor { attributes, .. } => *attributes,
        }
    }

    /// Check for an accessor descriptor
    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }
}

type PropertyTable = IndexMap<PropertyKey, PropertyDescriptor, FxBuildHasher>;

/// A script object
///
/// Thread-safe with interior mutability.
pub struct JsObject {
    /// Properties storage (insertion-ordered)
    properties: RwLock<PropertyTable>,
    /// Prototype link (null for the chain root), mutable via setPrototypeOf
    prototype: RwLock<Option<Arc<JsObject>>>,
    /// Array elements (for array objects)
    elements: RwLock<Vec<Value>>,
    /// Whether new own properties may be added
    extensible: AtomicBool,
    /// Native call slot; present for callable objects
    call: Option<NativeFunction>,
    /// Is this an array
    is_array: bool,
}

impl JsObject {
    /// Create a new empty object
    pub fn new(prototype: Option<Arc<JsObject>>) -> Self {
        Self {
            properties: RwLock::new(PropertyTable::default()),
            prototype: RwLock::new(prototype),
            elements: RwLock::new(Vec::new()),
            extensible: AtomicBool::new(true),
            call: None,
            is_array: false,
        }
    }

    /// Create an array from a list of element values
    pub fn array_from(elements: Vec<Value>) -> Self {
        Self {
            properties: RwLock::new(PropertyTable::default()),
            prototype: RwLock::new(None),
            elements: RwLock::new(elements),
            extensible: AtomicBool::new(true),
            call: None,
            is_array: true,
        }
    }

    /// Create a callable object from a native function payload
    pub fn function(native: NativeFunction) -> Self {
        Self {
            properties: RwLock::new(PropertyTable::default()),
            prototype: RwLock::new(None),
            elements: RwLock::new(Vec::new()),
            extensible: AtomicBool::new(true),
            call: Some(native),
            is_array: false,
        }
    }

    /// Get an own property descriptor, including synthesized array slots
    pub fn own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.read().get(key) {
            return Some(desc.clone());
        }
        match key {
            PropertyKey::Index(i) => {
                let elements = self.elements.read();
                elements
                    .get(*i as usize)
                    .map(|v| PropertyDescriptor::data(v.clone()))
            }
            PropertyKey::String(s) if self.is_array && s.as_str() == "length" => {
                Some(PropertyDescriptor::data_with_attrs(
                    Value::number(self.elements.read().len() as f64),
                    PropertyAttributes {
                        writable: true,
                        enumerable: false,
                        configurable: false,
                    },
                ))
            }
            _ => None,
        }
    }

    /// Check if object has an own property
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.own_property(key).is_some()
    }

    /// Insert or overwrite an own property, with no validity checks
    pub fn define_raw(&self, key: PropertyKey, desc: PropertyDescriptor) {
        if self.is_array
            && let PropertyKey::Index(i) = key
            && let PropertyDescriptor::Data { value, .. } = &desc
        {
            let mut elements = self.elements.write();
            let idx = i as usize;
            if idx >= elements.len() {
                elements.resize(idx + 1, Value::undefined());
            }
            elements[idx] = value.clone();
            return;
        }
        self.properties.write().insert(key, desc);
    }

    /// Remove an own property, with no configurability check
    pub fn remove_own(&self, key: &PropertyKey) -> bool {
        if self.properties.write().shift_remove(key).is_some() {
            return true;
        }
        if let PropertyKey::Index(i) = key {
            let mut elements = self.elements.write();
            if (*i as usize) < elements.len() {
                elements[*i as usize] = Value::undefined();
                return true;
            }
        }
        false
    }

    /// Own keys in storage order: element indices ascending, then the
    /// synthesized array `length`, then table keys in insertion order
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::new();
        let elements = self.elements.read();
        for i in 0..elements.len() {
            keys.push(PropertyKey::Index(i as u32));
        }
        drop(elements);
        if self.is_array {
            keys.push(PropertyKey::String(well_known::LENGTH.clone()));
        }
        keys.extend(self.properties.read().keys().cloned());
        keys
    }

    /// Get the prototype link
    pub fn prototype(&self) -> Option<Arc<JsObject>> {
        self.prototype.read().clone()
    }

    /// Replace the prototype link, with no extensibility or cycle check
    pub fn set_prototype_raw(&self, proto: Option<Arc<JsObject>>) {
        *self.prototype.write() = proto;
    }

    /// Whether new own properties may be added
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Relaxed)
    }

    /// Clear the extensibility flag (irreversible)
    pub fn prevent_extensions(&self) {
        self.extensible.store(false, Ordering::Relaxed);
    }

    /// Borrow the native call slot, if any
    pub fn call_slot(&self) -> Option<&NativeFunction> {
        self.call.as_ref()
    }

    /// Check whether the object is callable
    pub fn is_callable(&self) -> bool {
        self.call.is_some()
    }

    /// Check whether the object supports construct invocation
    pub fn is_constructor(&self) -> bool {
        self.call.as_ref().is_some_and(|c| c.constructor)
    }

    /// Check if object is an array
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Get array length (element count)
    pub fn array_length(&self) -> usize {
        self.elements.read().len()
    }

    /// Get an element by index
    pub fn element(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).cloned()
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObject")
            .field("properties", &self.properties.read().len())
            .field("is_array", &self.is_array)
            .field("callable", &self.call.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_define_and_read() {
        let obj = JsObject::new(None);

        obj.define_raw(PropertyKey::string("foo"), PropertyDescriptor::data(Value::number(42.0)));
        let desc = obj.own_property(&PropertyKey::string("foo")).unwrap();
        assert_eq!(desc.value(), Some(&Value::number(42.0)));
    }

    #[test]
    fn test_remove_own() {
        let obj = JsObject::new(None);
        obj.define_raw(PropertyKey::string("foo"), PropertyDescriptor::data(Value::number(1.0)));

        assert!(obj.remove_own(&PropertyKey::string("foo")));
        assert!(!obj.has_own(&PropertyKey::string("foo")));
        assert!(!obj.remove_own(&PropertyKey::string("foo")));
    }

    #[test]
    fn test_array_slots() {
        let arr = JsObject::array_from(vec![Value::number(1.0), Value::number(2.0)]);

        assert!(arr.is_array());
        assert_eq!(arr.array_length(), 2);
        let len = arr.own_property(&PropertyKey::string("length")).unwrap();
        assert_eq!(len.value(), Some(&Value::number(2.0)));
        let first = arr.own_property(&PropertyKey::Index(0)).unwrap();
        assert_eq!(first.value(), Some(&Value::number(1.0)));
    }

    #[test]
    fn test_own_keys_order() {
        let obj = JsObject::new(None);
        obj.define_raw(PropertyKey::string("b"), PropertyDescriptor::data(Value::number(1.0)));
        obj.define_raw(PropertyKey::string("a"), PropertyDescriptor::data(Value::number(2.0)));

        let keys = obj.own_keys();
        assert_eq!(keys[0], PropertyKey::string("b"));
        assert_eq!(keys[1], PropertyKey::string("a"));
    }

    #[test]
    fn test_key_handle_releases_once() {
        let live = Arc::new(AtomicUsize::new(0));

        let handle = PropertyKeyHandle::new(PropertyKey::string("x"), live.clone());
        assert_eq!(live.load(Ordering::Relaxed), 1);
        assert_eq!(handle.key(), &PropertyKey::string("x"));

        drop(handle);
        assert_eq!(live.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_prevent_extensions() {
        let obj = JsObject::new(None);
        assert!(obj.is_extensible());
        obj.prevent_extensions();
        assert!(!obj.is_extensible());
    }

    #[test]
    fn test_object_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JsObject>();
    }
}
