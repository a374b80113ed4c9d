//! Subscriber Sets
//!
//! A [`Dep`] is the set of effects interested in one data location: a key of
//! a reactive object, a ref's value, or a computed's value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::reactive::{EffectId, Subscriber};

/// Members of a [`Dep`] copied out for one notification pass.
pub(crate) type Snapshot = SmallVec<[Rc<dyn Subscriber>; 8]>;

/// Ordered set of subscribed effects.
///
/// Insertion order is preserved and an effect appears at most once. The set
/// owns its effects: a fire-and-forget effect stays alive for as long as a
/// `Dep` refers to it.
#[derive(Default)]
pub(crate) struct Dep {
    subscribers: RefCell<IndexMap<EffectId, Rc<dyn Subscriber>>>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already a member.
    pub(crate) fn insert(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        match self.subscribers.borrow_mut().entry(subscriber.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Rc::clone(subscriber));
                true
            }
        }
    }

    /// Remove a subscriber, keeping the order of the rest.
    pub(crate) fn remove(&self, id: EffectId) -> bool {
        // Bind first so the removed effect drops after the borrow ends.
        let removed = self.subscribers.borrow_mut().shift_remove(&id);
        removed.is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.subscribers.borrow().contains_key(&id)
    }

    /// Copy the current members so they can run while the set changes.
    pub(crate) fn snapshot(&self) -> Snapshot {
        self.subscribers.borrow().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<EffectId> = self
            .subscribers
            .try_borrow()
            .map(|subs| subs.keys().copied().collect())
            .unwrap_or_default();
        f.debug_struct("Dep").field("subscribers", &ids).finish()
    }
}
