//! Ref Implementation
//!
//! A Ref is a reactive box around a single [`Value`]. It has no object to
//! key the dependency store by, so it owns its subscriber set directly and
//! creates it on the first tracked read.
//!
//! # Deep values
//!
//! When the boxed value is an object, the ref also holds that object's
//! reactive view, and [`Ref::get`] hands out the view. Reads through it are
//! tracked like any other reactive object.
//!
//! # Change detection
//!
//! [`Ref::set`] compares against the previous raw value with
//! [`Value::same_value`], so writing `NaN` over `NaN` or an object over
//! itself is silent.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::computed::Computed;
use super::proxy::{make_reactive, Reactive};
use super::runtime;
use crate::graph::Dep;
use crate::value::{has_changed, RawObject, Value};

/// What a ref hands out: its value, with objects replaced by their
/// reactive view.
#[derive(Clone, Debug)]
pub enum RefValue {
    Value(Value),
    Reactive(Reactive),
}

impl RefValue {
    fn wrap(value: &Value) -> Self {
        match value {
            Value::Object(object) => RefValue::Reactive(make_reactive(object)),
            other => RefValue::Value(other.clone()),
        }
    }

    /// The plain value, if this is not an object.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            RefValue::Value(value) => Some(value),
            RefValue::Reactive(_) => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            RefValue::Reactive(view) => Some(view),
            RefValue::Value(_) => None,
        }
    }

    /// Unwrap to a plain [`Value`]; views become their raw object.
    pub fn to_value(&self) -> Value {
        match self {
            RefValue::Value(value) => value.clone(),
            RefValue::Reactive(view) => Value::Object(view.raw().clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }
}

impl PartialEq<Value> for RefValue {
    fn eq(&self, other: &Value) -> bool {
        self.to_value().same_value(other)
    }
}

/// Reactive single-value box.
///
/// Cloning a `Ref` yields another handle to the same box.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

struct RefInner {
    /// Last value written, as given.
    raw: RefCell<Value>,
    /// `raw`, with objects wrapped.
    exposed: RefCell<RefValue>,
    /// Created on the first tracked read.
    dep: RefCell<Option<Rc<Dep>>>,
}

impl Ref {
    pub fn new(value: impl Into<Value>) -> Self {
        let raw = value.into();
        let exposed = RefValue::wrap(&raw);
        Self {
            inner: Rc::new(RefInner {
                raw: RefCell::new(raw),
                exposed: RefCell::new(exposed),
                dep: RefCell::new(None),
            }),
        }
    }

    /// Get the value, recording the read.
    pub fn get(&self) -> RefValue {
        runtime::track_slot(&self.inner.dep);
        self.inner.exposed.borrow().clone()
    }

    /// Get the value without recording the read.
    pub fn get_untracked(&self) -> RefValue {
        self.inner.exposed.borrow().clone()
    }

    /// The raw value last written. Not tracked.
    pub fn raw(&self) -> Value {
        self.inner.raw.borrow().clone()
    }

    /// Store `value` and notify readers, unless it is the same value as
    /// before.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        let changed = has_changed(&value, &self.inner.raw.borrow());
        if !changed {
            return;
        }

        let exposed = RefValue::wrap(&value);
        let old_raw = self.inner.raw.replace(value);
        let old_exposed = self.inner.exposed.replace(exposed);
        drop((old_raw, old_exposed));

        tracing::trace!(subscribers = self.subscriber_count(), "ref changed");
        runtime::trigger_slot(&self.inner.dep);
    }

    /// Set the value to `f` of the current raw value. The read is not
    /// tracked.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let current = self.raw();
        self.set(f(&current));
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.borrow().as_ref().map_or(0, |dep| dep.len())
    }

    /// True when both handles share one box.
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &*self.inner.raw.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a [`Ref`] holding `value`.
pub fn make_ref(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

/// Types that may or may not be ref-shaped handles.
pub trait IsRef {
    fn is_ref(&self) -> bool;
}

impl IsRef for Ref {
    fn is_ref(&self) -> bool {
        true
    }
}

impl<T: Clone + 'static> IsRef for Computed<T> {
    fn is_ref(&self) -> bool {
        true
    }
}

impl IsRef for Reactive {
    fn is_ref(&self) -> bool {
        false
    }
}

impl IsRef for RefValue {
    fn is_ref(&self) -> bool {
        false
    }
}

impl IsRef for Value {
    fn is_ref(&self) -> bool {
        false
    }
}

impl IsRef for RawObject {
    fn is_ref(&self) -> bool {
        false
    }
}

/// True iff `candidate` is a [`Ref`] or a [`Computed`].
pub fn is_ref<R: IsRef + ?Sized>(candidate: &R) -> bool {
    candidate.is_ref()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
