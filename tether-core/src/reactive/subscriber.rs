//! Subscriber types for the reactive system.
//!
//! A subscriber is anything a [`Dep`](crate::graph::Dep) can hold: in
//! practice an [`Effect`](super::Effect), either a plain one or the one
//! owned by a [`Computed`](super::Computed).

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::graph::Dep;

/// Unique identifier for an effect.
///
/// Subscriber sets are keyed by this ID, which is what collapses duplicate
/// subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an effect backs a computed value.
///
/// Notification runs every `Derived` subscriber of a set before any
/// `Plain` one, so a plain effect that reads a computed never sees it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectRole {
    /// An ordinary side effect.
    Plain,
    /// The internal effect of a computed.
    Derived,
}

/// Type-erased view of an effect, as stored in subscriber sets and on the
/// active-effect stack.
pub(crate) trait Subscriber {
    fn id(&self) -> EffectId;

    fn role(&self) -> EffectRole;

    /// React to a change: invoke the scheduler if there is one, otherwise
    /// re-run.
    fn notify(self: Rc<Self>);

    /// Remember that this subscriber was added to `dep`.
    fn link(&self, dep: &Rc<Dep>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_ids_are_unique() {
        let id1 = EffectId::new();
        let id2 = EffectId::new();
        let id3 = EffectId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}
