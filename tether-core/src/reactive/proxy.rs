//! Reactive Objects
//!
//! A [`Reactive`] is the observable face of a [`RawObject`]. It has the same
//! keys and values; the difference is that reading through it records the
//! active effect and writing through it notifies the effects that read.
//!
//! Rust has no transparent property interception, so observation happens in
//! the explicit [`get`](Reactive::get) and [`set`](Reactive::set)
//! accessors. Both key the dependency store by the *raw* object's identity.
//!
//! # Identity
//!
//! [`make_reactive`] keeps a per-thread cache from object id to view, so
//! wrapping the same object twice yields the same view for as long as any
//! handle to that view is alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::Runtime;
use crate::value::{ObjectId, RawObject, Value};

thread_local! {
    static PROXY_CACHE: RefCell<HashMap<ObjectId, Weak<ViewInner>>> = RefCell::new(HashMap::new());
}

/// Tracked view of a raw object.
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ViewInner>,
}

struct ViewInner {
    raw: RawObject,
}

/// Get the reactive view of `target`, creating it on first use.
///
/// ```rust
/// use tether_core::reactive::make_reactive;
/// use tether_core::RawObject;
///
/// let raw = RawObject::new().with("count", 0);
/// let first = make_reactive(&raw);
/// let second = make_reactive(&raw);
/// assert!(first.ptr_eq(&second));
/// ```
pub fn make_reactive(target: &RawObject) -> Reactive {
    let id = target.id();
    let cached = PROXY_CACHE.with(|cache| cache.borrow().get(&id).and_then(Weak::upgrade));
    if let Some(inner) = cached {
        return Reactive { inner };
    }

    let inner = Rc::new(ViewInner {
        raw: target.clone(),
    });
    PROXY_CACHE.with(|cache| {
        cache.borrow_mut().insert(id, Rc::downgrade(&inner));
    });
    tracing::trace!(object = %id, "created reactive view");
    Reactive { inner }
}

/// Drop the cache slot of a dropped object.
pub(crate) fn release_view(object: ObjectId) {
    let _ = PROXY_CACHE.try_with(|cache| {
        if let Ok(mut cache) = cache.try_borrow_mut() {
            cache.remove(&object);
        }
    });
}

impl Reactive {
    /// Read `key`, recording the read. Missing keys read as [`Value::Null`].
    ///
    /// Nested objects come back raw; use [`child`](Self::child) for a
    /// tracked view of them.
    pub fn get(&self, key: &str) -> Value {
        let value = self.inner.raw.get(key);
        Runtime::track(self.id(), key);
        value
    }

    /// Write `key`, then notify every effect that read it.
    ///
    /// Writes always notify, even when the value did not change.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let previous = self.inner.raw.set(key, value);
        drop(previous);
        Runtime::trigger(self.id(), key);
    }

    /// Read `key`, then write `f` of it.
    pub fn update(&self, key: &str, f: impl FnOnce(&Value) -> Value) {
        let current = self.get(key);
        self.set(key, f(&current));
    }

    /// Tracked read of `key` that wraps an object value in its own view.
    ///
    /// The read of `key` and later reads through the returned view are
    /// tracked independently.
    pub fn child(&self, key: &str) -> Option<Reactive> {
        match self.get(key) {
            Value::Object(object) => Some(make_reactive(&object)),
            _ => None,
        }
    }

    /// The wrapped object. Access through it is not tracked.
    pub fn raw(&self) -> &RawObject {
        &self.inner.raw
    }

    pub fn id(&self) -> ObjectId {
        self.inner.raw.id()
    }

    /// True when both handles are the same view.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Untracked snapshot of the current contents.
    pub fn to_json(&self) -> serde_json::Value {
        self.inner.raw.to_json()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&self.inner.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::cell::Cell;

    #[test]
    fn wrapping_is_identity_stable() {
        let raw = RawObject::new().with("a", 1);
        let first = make_reactive(&raw);
        let second = make_reactive(&raw);
        let other = make_reactive(&RawObject::new().with("a", 1));

        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&other));
        assert!(first.raw().ptr_eq(&raw));
    }

    #[test]
    fn reads_and_writes_pass_through() {
        let raw = RawObject::new().with("count", 0);
        let state = make_reactive(&raw);

        state.set("count", 5);
        assert_eq!(raw.get("count"), 5.into());
        assert_eq!(state.get("count"), 5.into());
        assert!(state.get("missing").is_null());
    }

    #[test]
    fn reads_record_against_the_raw_identity() {
        let raw = RawObject::new().with("count", 0);
        let state = make_reactive(&raw);
        let reader = state.clone();
        let _effect = Effect::new(move || reader.get("count"));

        assert_eq!(Runtime::subscriber_count(raw.id(), "count"), 1);
    }

    #[test]
    fn writes_notify_even_when_unchanged() {
        let state = make_reactive(&RawObject::new().with("count", 0));
        let reader = state.clone();
        let effect = Effect::new(move || reader.get("count"));

        state.set("count", 0);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn update_reads_then_writes() {
        let state = make_reactive(&RawObject::new().with("count", 1));
        state.update("count", |v| Value::from(v.as_f64().unwrap_or(0.0) * 10.0));
        assert_eq!(state.raw().get("count"), 10.into());
    }

    #[test]
    fn child_views_track_independently() {
        let raw = RawObject::new().with("a", RawObject::new().with("b", 1));
        let state = make_reactive(&raw);

        let outer_runs = Rc::new(Cell::new(0));
        let reader = state.clone();
        let runs = outer_runs.clone();
        let _outer = Effect::new(move || {
            runs.set(runs.get() + 1);
            reader.get("a");
        });

        let nested = state.child("a").expect("object");
        nested.set("b", 2);

        // Only `a` itself is tracked by the outer effect.
        assert_eq!(outer_runs.get(), 1);

        let replacement = RawObject::new().with("b", 3);
        state.set("a", replacement);
        assert_eq!(outer_runs.get(), 2);
    }

    #[test]
    fn child_of_primitive_is_none() {
        let state = make_reactive(&RawObject::new().with("n", 1));
        assert!(state.child("n").is_none());
        assert!(state.child("missing").is_none());
    }

    #[test]
    fn cache_slot_is_released_with_the_object() {
        let raw = RawObject::new();
        let id = raw.id();
        let view = make_reactive(&raw);
        drop(raw);
        assert!(PROXY_CACHE.with(|c| c.borrow().contains_key(&id)));

        drop(view);
        assert!(!PROXY_CACHE.with(|c| c.borrow().contains_key(&id)));
    }
}
