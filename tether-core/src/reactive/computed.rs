//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when
//! something it read has changed, and only when it is read.
//!
//! # How Computeds Work
//!
//! 1. A computed starts dirty. The first read runs the getter inside the
//!    computed's own effect, which records every source it touches, and
//!    caches the result.
//!
//! 2. Reads while clean return the cached value without calling the getter.
//!
//! 3. When a source changes, the effect's scheduler runs instead of the
//!    getter: the computed becomes dirty and notifies its own readers. A
//!    computed that is already dirty does nothing, so its readers hear about
//!    a batch of source changes once.
//!
//! 4. The next read recomputes.
//!
//! Reading `value` is itself tracked: an effect that reads a computed
//! re-runs when the computed turns dirty. Because effects backing computeds
//! are notified before plain effects, that re-run sees the fresh value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::untrack;
use super::effect::Effect;
use super::runtime;
use super::subscriber::EffectId;
use crate::error::{ReactiveError, Result};
use crate::graph::Dep;

/// A lazily evaluated, memoized derivation.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{make_computed, make_ref};
///
/// let count = make_ref(2);
/// let source = count.clone();
/// let doubled = make_computed(move || source.get().as_f64().unwrap_or(0.0) * 2.0);
///
/// assert_eq!(doubled.get(), 4.0);
/// count.set(5);
/// assert_eq!(doubled.get(), 10.0);
/// ```
pub struct Computed<T: Clone + 'static> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T: 'static> {
    /// Runs the getter and tracks its sources.
    effect: Effect<T>,

    /// True until computed, and again after any source changes.
    dirty: Cell<bool>,

    /// The cached value (None if never computed).
    value: RefCell<Option<T>>,

    /// Readers of this computed, created on the first tracked read.
    dep: RefCell<Option<Rc<Dep>>>,
}

impl<T: 'static> ComputedInner<T> {
    /// Scheduler body: a source changed.
    fn invalidate(&self) {
        if self.dirty.get() {
            return;
        }
        self.dirty.set(true);
        tracing::trace!(effect = ?self.effect.id(), "computed invalidated");
        runtime::trigger_slot(&self.dep);
    }
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
    }
}

/// Marks the computed dirty again unless the getter returned.
struct Rearm<'a> {
    dirty: &'a Cell<bool>,
    completed: bool,
}

impl Drop for Rearm<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.dirty.set(true);
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Create a computed over `getter`. Nothing runs until the first read.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let effect = Effect::derived(getter, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.invalidate();
                }
            });
            ComputedInner {
                effect,
                dirty: Cell::new(true),
                value: RefCell::new(None),
                dep: RefCell::new(None),
            }
        });
        Self { inner }
    }

    /// Get the value, recomputing it first if dirty.
    ///
    /// # Panics
    ///
    /// Panics if the computed reads itself during its first evaluation. See
    /// [`try_get`](Self::try_get) for a non-panicking variant.
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Get the value, recomputing it first if dirty.
    ///
    /// A computed that reads itself while recomputing sees its previous
    /// value; if there is none yet, this returns
    /// [`ReactiveError::CircularComputed`].
    pub fn try_get(&self) -> Result<T> {
        runtime::track_slot(&self.inner.dep);

        if self.inner.dirty.replace(false) {
            let mut rearm = Rearm {
                dirty: &self.inner.dirty,
                completed: false,
            };
            let value = self.inner.effect.run();
            rearm.completed = true;
            drop(rearm);

            let previous = self.inner.value.replace(Some(value));
            drop(previous);
        }

        self.inner
            .value
            .borrow()
            .clone()
            .ok_or(ReactiveError::CircularComputed)
    }

    /// Get the value without recording the read.
    pub fn get_untracked(&self) -> T {
        untrack(|| self.get())
    }

    /// Whether the next read will call the getter.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Check if the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.borrow().as_ref().map_or(0, |dep| dep.len())
    }

    /// ID of the internal effect.
    pub fn effect_id(&self) -> EffectId {
        self.inner.effect.id()
    }
}

impl<T: Clone + 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("effect", &self.inner.effect.id())
            .field("dirty", &self.is_dirty())
            .field("has_value", &self.has_value())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a [`Computed`] over `getter`.
pub fn make_computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Computed::new(getter)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
