//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever the reactive locations
//! it read change.
//!
//! # How Effects Work
//!
//! 1. Running an effect makes it the active effect for the duration of its
//!    body. Every tracked read during that time subscribes it.
//!
//! 2. When a subscribed location is written, the effect is notified. With a
//!    scheduler, the scheduler is called instead of the body; this is how
//!    a computed turns "a source changed" into "mark myself dirty".
//!
//! 3. Re-runs only add subscriptions. Locations read by an earlier run and
//!    skipped by a later one keep the effect subscribed.
//!
//! # Stopping
//!
//! Each effect remembers every subscriber set it joined. [`Effect::stop`]
//! walks that list and unlinks the effect from all of them, so a stopped
//! effect is never notified again. Running a stopped effect still calls its
//! body, without tracking.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::ReactiveContext;
use super::subscriber::{EffectId, EffectRole, Subscriber};
use crate::graph::Dep;

type Body<T> = Box<dyn Fn() -> T>;
type Scheduler = Box<dyn Fn()>;

/// A re-runnable reactive computation.
///
/// Cloning an `Effect` yields another handle to the same computation.
///
/// # Example
///
/// ```rust
/// use tether_core::reactive::{make_ref, Effect};
///
/// let count = make_ref(0);
/// let source = count.clone();
/// let effect = Effect::new(move || source.get().as_f64());
///
/// count.set(5);
/// assert_eq!(effect.run_count(), 2);
///
/// effect.stop();
/// count.set(6);
/// assert_eq!(effect.run_count(), 2);
/// ```
pub struct Effect<T: 'static> {
    inner: Rc<EffectInner<T>>,
}

struct EffectInner<T> {
    id: EffectId,

    /// The computation body.
    body: Body<T>,

    /// Called instead of the body when a dependency changes.
    scheduler: Option<Scheduler>,

    role: EffectRole,

    /// Subscriber sets this effect was added to.
    deps: RefCell<Vec<Weak<Dep>>>,

    /// False once stopped.
    active: Cell<bool>,

    /// Number of times the body has run.
    run_count: Cell<usize>,
}

impl<T: 'static> EffectInner<T> {
    fn run(self: &Rc<Self>) -> T {
        self.run_count.set(self.run_count.get() + 1);

        if !self.active.get() {
            let _ctx = ReactiveContext::pause();
            return (self.body)();
        }

        tracing::trace!(effect = ?self.id, role = ?self.role, "running effect");
        let _ctx = ReactiveContext::enter(Rc::clone(self) as Rc<dyn Subscriber>);
        (self.body)()
    }

    fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }

        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        let mut unlinked = 0;
        for dep in deps.iter().filter_map(Weak::upgrade) {
            if dep.remove(self.id) {
                unlinked += 1;
            }
        }
        tracing::debug!(effect = ?self.id, unlinked, "stopped effect");
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn role(&self) -> EffectRole {
        self.role
    }

    fn notify(self: Rc<Self>) {
        if !self.active.get() {
            return;
        }
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    fn link(&self, dep: &Rc<Dep>) {
        let mut deps = self.deps.borrow_mut();
        deps.retain(|dep| dep.strong_count() > 0);
        deps.push(Rc::downgrade(dep));
    }
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it once to establish its dependencies.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let effect = Self::new_lazy(body);
        effect.run();
        effect
    }

    /// Create an effect without running it.
    ///
    /// It tracks nothing until [`run`](Self::run) is called.
    pub fn new_lazy<F>(body: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Box::new(body), None, EffectRole::Plain)
    }

    /// Create an effect whose reaction to changes is `scheduler` instead of
    /// a re-run, and run it once to establish its dependencies.
    pub fn with_scheduler<F, S>(body: F, scheduler: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn() + 'static,
    {
        let effect = Self::build(Box::new(body), Some(Box::new(scheduler)), EffectRole::Plain);
        effect.run();
        effect
    }

    /// The lazy, scheduled effect behind a computed.
    pub(crate) fn derived<F, S>(body: F, scheduler: S) -> Self
    where
        F: Fn() -> T + 'static,
        S: Fn() + 'static,
    {
        Self::build(Box::new(body), Some(Box::new(scheduler)), EffectRole::Derived)
    }

    fn build(body: Body<T>, scheduler: Option<Scheduler>, role: EffectRole) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: EffectId::new(),
                body,
                scheduler,
                role,
                deps: RefCell::new(Vec::new()),
                active: Cell::new(true),
                run_count: Cell::new(0),
            }),
        }
    }

    /// Run the body as the active effect and return its result.
    ///
    /// The previous active effect is restored afterwards, also when the body
    /// panics.
    pub fn run(&self) -> T {
        self.inner.run()
    }

    /// Unlink the effect from every subscriber set it joined.
    ///
    /// Stopping twice is a no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    pub fn role(&self) -> EffectRole {
        self.inner.role
    }

    /// False once the effect has been stopped.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of live subscriber sets this effect belongs to.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .deps
            .borrow()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }

    pub(crate) fn as_subscriber(&self) -> Rc<dyn Subscriber> {
        Rc::clone(&self.inner) as Rc<dyn Subscriber>
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("role", &self.inner.role)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Run `body` once now and again whenever anything it read changes.
///
/// No handle is returned; the effect lives as long as some location it
/// read is still alive.
pub fn run_effect<T, F>(body: F)
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    Effect::new(body);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
