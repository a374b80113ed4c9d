//! Reactive Context
//!
//! The reactive context tracks which effect is currently running.
//! This enables automatic dependency tracking: when a reactive location is
//! read, the effect on top of the stack is recorded as its subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running an effect pushes it; the guard
//! returned by [`ReactiveContext::enter`] pops it when dropped, including
//! while unwinding from a panicking effect body.
//!
//! This design supports nested reactive contexts (e.g., an effect that
//! creates another effect, or a computed that reads another computed).
//! A paused entry (see [`untrack`]) hides everything below it.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{EffectId, Subscriber};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = RefCell::new(Vec::new());
}

/// An entry in the reactive context stack.
enum ContextEntry {
    /// An effect collecting dependencies.
    Tracking(Rc<dyn Subscriber>),
    /// Tracking is suspended until this entry is popped.
    Paused,
}

impl ContextEntry {
    fn id(&self) -> Option<EffectId> {
        match self {
            ContextEntry::Tracking(subscriber) => Some(subscriber.id()),
            ContextEntry::Paused => None,
        }
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<EffectId>,
}

impl ReactiveContext {
    /// Make `subscriber` the active effect until the guard drops.
    pub(crate) fn enter(subscriber: Rc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry::Tracking(subscriber));
        });
        Self { subscriber_id }
    }

    /// Suspend tracking until the guard drops.
    pub(crate) fn pause() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(ContextEntry::Paused));
        Self { subscriber_id: None }
    }

    /// Check if reads are currently being recorded.
    pub fn is_active() -> bool {
        Self::current_id().is_some()
    }

    /// Get the active effect's ID, if any.
    pub fn current_id() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(ContextEntry::id))
    }

    /// The innermost running effect, looking through paused entries.
    pub(crate) fn running_id() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| stack.borrow().iter().rev().find_map(ContextEntry::id))
    }

    /// Get the active effect, if any.
    pub(crate) fn current() -> Option<Rc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last() {
            Some(ContextEntry::Tracking(subscriber)) => Some(Rc::clone(subscriber)),
            _ => None,
        })
    }

    /// Number of entries on the stack, paused ones included.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten();

        // Verify we're popping the right context.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                entry.id()
            );
        }
    }
}

/// Run `f` without recording any of its reads.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::pause();
    f()
}
