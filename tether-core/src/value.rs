//! Value Model
//!
//! Reactive state is plain data: a small dynamic value type whose object
//! variant is a reference-counted, ordered map of string keys.
//!
//! # Identity
//!
//! Every [`RawObject`] receives a stable [`ObjectId`] when it is created.
//! Clones of a `RawObject` share the same storage and the same id, so the
//! id is what the dependency store and the proxy cache key on. Two objects
//! with equal contents are still distinct sources.
//!
//! When the last handle to an object is dropped, its dependency-store entry
//! and its proxy-cache slot are released with it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{ReactiveError, Result};

/// Stable identity of a raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dynamically typed piece of reactive data.
///
/// Equality follows [`Value::same_value`]: `NaN` equals itself, `0.0` and
/// `-0.0` differ, and objects compare by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(RawObject),
}

impl Value {
    /// Identity-style comparison used for change detection.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&RawObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Convert a JSON document. Objects become fresh [`RawObject`]s;
    /// arrays are rejected.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(_) => {
                return Err(ReactiveError::UnsupportedJson { kind: "array" })
            }
            serde_json::Value::Object(map) => {
                let object = RawObject::new();
                for (key, value) in map {
                    object.set(key, Value::from_json(value)?);
                }
                Value::Object(object)
            }
        })
    }

    /// Snapshot as JSON. Non-finite numbers become `null`.
    ///
    /// Objects that contain themselves are not supported.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Object(o) => o.to_json(),
        }
    }
}

/// Whether `n` can be written as a JSON integer without losing its sign.
fn is_integral(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < i64::MAX as f64 && !(n == 0.0 && n.is_sign_negative())
}

fn number_to_json(n: f64) -> serde_json::Value {
    if is_integral(n) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(o) => write!(f, "Object({:?})", o),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_integral(*n) => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(o) => o.serialize(serializer),
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<RawObject> for Value {
    fn from(o: RawObject) -> Self {
        Value::Object(o)
    }
}

impl From<&RawObject> for Value {
    fn from(o: &RawObject) -> Self {
        Value::Object(o.clone())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

// ----------------------------------------------------------------------------
// Raw objects
// ----------------------------------------------------------------------------

/// Plain, untracked object storage.
///
/// Reads and writes on a `RawObject` are invisible to the engine; wrap it
/// with [`make_reactive`](crate::reactive::make_reactive) to observe them.
#[derive(Clone)]
pub struct RawObject {
    inner: Rc<ObjectInner>,
}

struct ObjectInner {
    id: ObjectId,
    fields: RefCell<IndexMap<String, Value>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        crate::graph::release_object(self.id);
        crate::reactive::proxy::release_view(self.id);
    }
}

impl RawObject {
    /// Create an empty object with a fresh identity.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: ObjectId::next(),
                fields: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Builder-style insertion.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Build an object from a JSON object document.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(_) => match Value::from_json(json)? {
                Value::Object(object) => Ok(object),
                other => Err(ReactiveError::NotAnObject { found: other.kind() }),
            },
            serde_json::Value::Array(_) => Err(ReactiveError::NotAnObject { found: "array" }),
            other => Err(ReactiveError::NotAnObject {
                found: Value::from_json(other)?.kind(),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// Read a property. Missing keys read as [`Value::Null`].
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .fields
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a property, returning the previous value if there was one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let previous = self
            .inner
            .fields
            .borrow_mut()
            .insert(key.into(), value.into());
        previous
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.borrow().is_empty()
    }

    /// True when both handles refer to the same object.
    pub fn ptr_eq(&self, other: &RawObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields = self.inner.fields.borrow();
        let map = fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Default for RawObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RawObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self
            .inner
            .fields
            .try_borrow()
            .map(|fields| fields.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        f.debug_struct("RawObject")
            .field("id", &self.inner.id)
            .field("keys", &keys)
            .finish()
    }
}

impl Serialize for RawObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.inner.fields.borrow();
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, value) in fields.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// True when `value` differs from `old` under [`Value::same_value`].
pub fn has_changed(value: &Value, old: &Value) -> bool {
    !value.same_value(old)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nan_is_the_same_value_as_itself() {
        let nan = Value::Number(f64::NAN);
        assert!(nan.same_value(&Value::Number(f64::NAN)));
        assert!(!has_changed(&nan, &Value::Number(f64::NAN)));
    }

    #[test]
    fn signed_zeros_differ() {
        assert!(has_changed(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!has_changed(&Value::Number(1.0), &Value::from(1)));
    }

    #[test]
    fn negative_zero_survives_json() {
        let json = Value::Number(-0.0).to_json();
        let back = Value::from_json(json).unwrap();
        assert!(back.same_value(&Value::Number(-0.0)));

        let text = serde_json::to_string(&Value::Number(-0.0)).unwrap();
        assert_eq!(text, "-0.0");
        assert_eq!(serde_json::to_string(&Value::Number(0.0)).unwrap(), "0");
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = RawObject::new().with("x", 1);
        let b = RawObject::new().with("x", 1);
        assert_ne!(Value::from(&a), Value::from(&b));
        assert_eq!(Value::from(&a), Value::from(a.clone()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn missing_keys_read_as_null() {
        let object = RawObject::new();
        assert!(object.get("nope").is_null());
        assert!(!object.contains_key("nope"));
    }

    #[test]
    fn set_returns_previous_value() {
        let object = RawObject::new();
        assert_eq!(object.set("a", 1), None);
        assert_eq!(object.set("a", 2), Some(Value::from(1)));
        assert_eq!(object.get("a"), Value::from(2));
    }

    #[test]
    fn keys_keep_insertion_order() {
        let object = RawObject::new().with("b", 1).with("a", 2).with("c", 3);
        assert_eq!(object.keys(), vec!["b", "a", "c"]);
        assert_eq!(object.len(), 3);
    }

    #[test]
    fn from_json_builds_nested_objects() {
        let object = RawObject::from_json(json!({"a": {"b": 1}, "name": "x"})).unwrap();
        let nested = object.get("a");
        let nested = nested.as_object().expect("nested object");
        assert_eq!(nested.get("b").as_f64(), Some(1.0));
        assert_eq!(object.get("name").as_str(), Some("x"));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        let err = RawObject::from_json(json!(3)).unwrap_err();
        assert!(matches!(err, ReactiveError::NotAnObject { found: "number" }));

        let err = RawObject::from_json(json!({"list": [1, 2]})).unwrap_err();
        assert!(matches!(err, ReactiveError::UnsupportedJson { kind: "array" }));
    }

    #[test]
    fn json_round_trip_keeps_integers() {
        let doc = json!({"count": 3, "ratio": 0.5, "ok": true, "none": null});
        let object = RawObject::from_json(doc.clone()).unwrap();
        assert_eq!(object.to_json(), doc);
        assert_eq!(serde_json::to_value(&object).unwrap(), doc);
    }
}
