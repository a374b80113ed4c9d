//! Dependency Graph
//!
//! This module stores which effects depend on which data locations.
//!
//! # Overview
//!
//! The graph is bipartite: data locations on one side, effects on the
//! other. Each location owns a [`Dep`], the ordered set of effects that
//! read it. Each effect keeps weak back-edges to the `Dep`s it joined so
//! that stopping it can unlink it everywhere.
//!
//! Locations of reactive objects live in a thread-local [`DepStore`] keyed
//! by `(ObjectId, key)`. Refs and computeds own their `Dep` directly and
//! never touch the store.
//!
//! # Reclamation
//!
//! When the last handle to a raw object drops, [`release_object`] removes
//! its store entry. The removed `Dep`s are dropped only after the store
//! borrow has ended, since dropping them can drop effects whose closures
//! own other objects.

mod dep;
mod store;

use std::cell::RefCell;

pub(crate) use dep::Dep;
pub(crate) use store::DepStore;

use crate::value::ObjectId;

thread_local! {
    static STORE: RefCell<DepStore> = RefCell::new(DepStore::new());
}

/// Run `f` with mutable access to this thread's store.
///
/// `f` must not run user code: effects and drops happen outside.
pub(crate) fn with_store<R>(f: impl FnOnce(&mut DepStore) -> R) -> R {
    STORE.with(|store| f(&mut store.borrow_mut()))
}

/// Forget everything recorded about a dropped object.
pub(crate) fn release_object(object: ObjectId) {
    // Objects can drop during thread teardown or while the store is being
    // edited further up the stack; in both cases the entry is left behind.
    let removed = STORE
        .try_with(|store| {
            store
                .try_borrow_mut()
                .ok()
                .and_then(|mut store| store.remove_object(object))
        })
        .ok()
        .flatten();

    if let Some(deps) = removed {
        tracing::debug!(object = %object, keys = deps.len(), "released dependency store entry");
        drop(deps);
    }
}
