//! Reactive Runtime
//!
//! The runtime connects reads and writes to effects. It implements the two
//! halves of dependency tracking:
//!
//! - **record** ([`Runtime::track`]): called on every read. If an effect is
//!   active, it joins the subscriber set of the location read.
//!
//! - **notify** ([`Runtime::trigger`]): called on every write. The members of
//!   the location's subscriber set are copied out and notified; effects
//!   backing computeds go first, plain effects after, so a plain effect
//!   that reads a computed always sees it refreshed.
//!
//! Missing state is never an error. Reading with no active effect, or
//! writing a location that nobody read, does nothing.
//!
//! # Cycles
//!
//! An effect is not re-notified by its own writes while it is running,
//! including writes made inside [`untrack`](super::untrack). Beyond that,
//! nested passes that reach plain effects are counted and cut off at
//! [`RuntimeConfig::max_notify_depth`] with a panic. Pure computed
//! invalidation is not counted: however long a chain of computeds is, a
//! write marks each of them dirty at most once.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::context::ReactiveContext;
use super::subscriber::{EffectId, EffectRole, Subscriber};
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{self, Dep};
use crate::value::ObjectId;

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::default());
    static NOTIFY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Entry point to the dependency-tracking machinery of the current thread.
pub struct Runtime;

impl Runtime {
    /// Record a read of `key` on `object` by the active effect.
    pub fn track(object: ObjectId, key: &str) {
        let Some(active) = ReactiveContext::current() else {
            return;
        };
        let dep = graph::with_store(|store| store.dep_for(object, key));
        if track_effect(&dep, &active) {
            tracing::trace!(object = %object, key, effect = ?active.id(), "recorded dependency");
        }
    }

    /// Notify every effect that read `key` on `object`.
    pub fn trigger(object: ObjectId, key: &str) {
        let Some(dep) = graph::with_store(|store| store.get(object, key)) else {
            return;
        };
        tracing::trace!(object = %object, key, subscribers = dep.len(), "notifying");
        trigger_dep(&dep);
    }

    /// Install `config` for the current thread.
    pub fn configure(config: RuntimeConfig) -> Result<()> {
        config.validate()?;
        CONFIG.with(|slot| slot.set(config));
        tracing::debug!(?config, "configured reactive runtime");
        Ok(())
    }

    /// The configuration in effect on the current thread.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(Cell::get)
    }

    /// Check if reads are currently being recorded.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    /// Get the active effect, if any.
    pub fn current_effect() -> Option<EffectId> {
        ReactiveContext::current_id()
    }

    /// Number of objects with at least one recorded location.
    pub fn tracked_objects() -> usize {
        graph::with_store(|store| store.object_count())
    }

    /// Number of recorded locations on `object`.
    pub fn tracked_keys(object: ObjectId) -> usize {
        graph::with_store(|store| store.key_count(object))
    }

    /// Number of effects subscribed to `key` on `object`.
    pub fn subscriber_count(object: ObjectId, key: &str) -> usize {
        graph::with_store(|store| store.get(object, key))
            .map_or(0, |dep| dep.len())
    }
}

/// Add `active` to `dep`, keeping the reverse index in sync.
fn track_effect(dep: &Rc<Dep>, active: &Rc<dyn Subscriber>) -> bool {
    let inserted = dep.insert(active);
    if inserted {
        active.link(dep);
    }
    inserted
}

/// Record a read of a lazily created, owned `Dep` (refs and computeds).
pub(crate) fn track_slot(slot: &RefCell<Option<Rc<Dep>>>) {
    let Some(active) = ReactiveContext::current() else {
        return;
    };
    let dep = Rc::clone(slot.borrow_mut().get_or_insert_with(|| Rc::new(Dep::new())));
    track_effect(&dep, &active);
}

/// Notify the owned `Dep` in `slot`, if it was ever created.
pub(crate) fn trigger_slot(slot: &RefCell<Option<Rc<Dep>>>) {
    let dep = slot.borrow().clone();
    if let Some(dep) = dep {
        trigger_dep(&dep);
    }
}

/// One notification pass over a subscriber set.
pub(crate) fn trigger_dep(dep: &Dep) {
    if dep.is_empty() {
        return;
    }
    let snapshot = dep.snapshot();
    let running = ReactiveContext::running_id();

    // Computed invalidation stops at the first computed already dirty, so
    // only passes that reach a plain effect can loop.
    let _depth = snapshot
        .iter()
        .any(|s| s.role() == EffectRole::Plain && Some(s.id()) != running)
        .then(NotifyDepth::enter);

    for role in [EffectRole::Derived, EffectRole::Plain] {
        for subscriber in snapshot.iter().filter(|s| s.role() == role) {
            if Some(subscriber.id()) == running {
                continue;
            }
            Rc::clone(subscriber).notify();
        }
    }
}

/// Counts nested notification passes on this thread.
struct NotifyDepth;

impl NotifyDepth {
    fn enter() -> Self {
        let depth = NOTIFY_DEPTH.with(|d| {
            d.set(d.get() + 1);
            d.get()
        });
        // Constructed before the check so unwinding restores the count.
        let guard = NotifyDepth;

        let limit = Runtime::config().max_notify_depth;
        if depth > limit {
            let err = ReactiveError::NotifyDepthExceeded { depth, limit };
            tracing::error!(depth, limit, "aborting cyclic notification");
            panic!("{err}");
        }
        guard
    }
}

impl Drop for NotifyDepth {
    fn drop(&mut self) {
        let _ = NOTIFY_DEPTH.try_with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{make_computed, make_reactive, make_ref, untrack, Effect};
    use crate::value::{RawObject, Value};

    #[test]
    fn track_without_active_effect_records_nothing() {
        let object = RawObject::new();
        Runtime::track(object.id(), "count");

        assert_eq!(Runtime::tracked_keys(object.id()), 0);
        assert_eq!(Runtime::subscriber_count(object.id(), "count"), 0);
    }

    #[test]
    fn trigger_on_unknown_location_is_a_no_op() {
        let object = RawObject::new();
        Runtime::trigger(object.id(), "never-read");
        assert_eq!(Runtime::tracked_keys(object.id()), 0);
    }

    #[test]
    fn track_inside_effect_subscribes_once() {
        let object = RawObject::new();
        let id = object.id();
        let effect = Effect::new(move || {
            Runtime::track(id, "count");
            Runtime::track(id, "count");
        });

        assert_eq!(Runtime::subscriber_count(id, "count"), 1);
        assert_eq!(effect.dependency_count(), 1);
        assert!(!Runtime::is_tracking());
    }

    #[test]
    fn derived_effects_are_notified_before_plain_ones() {
        let object = RawObject::new();
        let id = object.id();
        let order = Rc::new(RefCell::new(Vec::new()));

        let plain_log = order.clone();
        let plain = Effect::with_scheduler(
            move || Runtime::track(id, "x"),
            move || plain_log.borrow_mut().push("plain"),
        );

        let derived_log = order.clone();
        let derived = Effect::derived(
            move || Runtime::track(id, "x"),
            move || derived_log.borrow_mut().push("derived"),
        );
        derived.run();

        Runtime::trigger(id, "x");
        assert_eq!(*order.borrow(), vec!["derived", "plain"]);
        drop((plain, derived));
    }

    #[test]
    fn effect_writing_what_it_reads_does_not_recurse() {
        let state = make_reactive(&RawObject::new().with("count", 0));
        let writer = state.clone();
        let effect = Effect::new(move || {
            let next = writer.get("count").as_f64().unwrap_or(0.0) + 1.0;
            writer.set("count", next);
        });

        assert_eq!(effect.run_count(), 1);
        assert_eq!(state.raw().get("count"), 1.into());
    }

    #[test]
    fn self_write_inside_untrack_does_not_recurse() {
        let state = make_reactive(&RawObject::new().with("count", 0));
        let writer = state.clone();
        let effect = Effect::new(move || {
            let next = writer.get("count").as_f64().unwrap_or(0.0) + 1.0;
            untrack(|| writer.set("count", next));
        });

        assert_eq!(effect.run_count(), 1);
        assert_eq!(state.raw().get("count"), 1.into());

        state.set("count", 10);
        assert_eq!(effect.run_count(), 2);
        assert_eq!(state.raw().get("count"), 11.into());
    }

    #[test]
    fn computed_chains_longer_than_the_limit_propagate() {
        Runtime::configure(RuntimeConfig { max_notify_depth: 4 }).unwrap();

        let base = make_ref(1);
        let source = base.clone();
        let mut tail = make_computed(move || source.get().as_f64().unwrap_or(0.0));
        for _ in 0..20 {
            let previous = tail.clone();
            tail = make_computed(move || previous.get() + 1.0);
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (end, sink) = (tail.clone(), seen.clone());
        let _effect = Effect::new(move || sink.borrow_mut().push(end.get()));

        base.set(10);
        assert_eq!(*seen.borrow(), vec![21.0, 30.0]);
        assert_eq!(NOTIFY_DEPTH.with(Cell::get), 0);
        Runtime::configure(RuntimeConfig::default()).unwrap();
    }

    #[test]
    fn configure_rejects_invalid_config() {
        let err = Runtime::configure(RuntimeConfig { max_notify_depth: 0 }).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidConfig(_)));
        assert_eq!(Runtime::config(), RuntimeConfig::default());
    }

    #[test]
    fn runaway_notification_panics_at_the_limit() {
        Runtime::configure(RuntimeConfig { max_notify_depth: 8 }).unwrap();

        let x = make_ref(0);
        let y = make_ref(0);
        let bump = |v: &Value| Value::from(v.as_f64().unwrap_or(0.0) + 1.0);

        // Each scheduler writes what the other one watches.
        let (rx, wy) = (x.clone(), y.clone());
        let _xy = Effect::with_scheduler(move || rx.get(), move || wy.update(bump));
        let (ry, wx) = (y.clone(), x.clone());
        let _yx = Effect::with_scheduler(move || ry.get(), move || wx.update(bump));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            x.set(1);
        }));

        assert!(result.is_err());
        assert_eq!(NOTIFY_DEPTH.with(Cell::get), 0);
        assert_eq!(ReactiveContext::depth(), 0);
        Runtime::configure(RuntimeConfig::default()).unwrap();
    }
}
