//! Dependency Store
//!
//! Two-level table from source object to property key to [`Dep`]. Entries
//! are created on the first tracked read of a location and are only ever
//! removed wholesale, when their object is dropped.

use std::collections::HashMap;
use std::rc::Rc;

use super::dep::Dep;
use crate::value::ObjectId;

/// Subscriber sets of one object, keyed by property.
pub(crate) type KeyToDep = HashMap<String, Rc<Dep>>;

/// The store behind record and notify.
#[derive(Debug, Default)]
pub(crate) struct DepStore {
    targets: HashMap<ObjectId, KeyToDep>,
}

impl DepStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get the `Dep` for a location, creating it (and the object's entry)
    /// on first use.
    pub(crate) fn dep_for(&mut self, object: ObjectId, key: &str) -> Rc<Dep> {
        let deps = self.targets.entry(object).or_default();
        if let Some(dep) = deps.get(key) {
            return Rc::clone(dep);
        }
        let dep = Rc::new(Dep::new());
        deps.insert(key.to_owned(), Rc::clone(&dep));
        dep
    }

    /// Look up an existing `Dep` without creating anything.
    pub(crate) fn get(&self, object: ObjectId, key: &str) -> Option<Rc<Dep>> {
        self.targets.get(&object)?.get(key).cloned()
    }

    /// Detach every `Dep` of an object.
    ///
    /// The caller drops the returned map once it no longer borrows the store.
    pub(crate) fn remove_object(&mut self, object: ObjectId) -> Option<KeyToDep> {
        self.targets.remove(&object)
    }

    pub(crate) fn object_count(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn key_count(&self, object: ObjectId) -> usize {
        self.targets.get(&object).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawObject;

    #[test]
    fn dep_for_is_created_once_per_location() {
        let object = RawObject::new();
        let mut store = DepStore::new();

        let first = store.dep_for(object.id(), "count");
        let second = store.dep_for(object.id(), "count");
        let other = store.dep_for(object.id(), "name");

        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(store.object_count(), 1);
        assert_eq!(store.key_count(object.id()), 2);
    }

    #[test]
    fn get_never_creates() {
        let object = RawObject::new();
        let mut store = DepStore::new();

        assert!(store.get(object.id(), "count").is_none());
        assert_eq!(store.object_count(), 0);

        store.dep_for(object.id(), "count");
        assert!(store.get(object.id(), "count").is_some());
        assert!(store.get(object.id(), "other").is_none());
    }

    #[test]
    fn distinct_objects_never_share_deps() {
        let a = RawObject::new().with("x", 1);
        let b = RawObject::new().with("x", 1);
        let mut store = DepStore::new();

        let dep_a = store.dep_for(a.id(), "x");
        let dep_b = store.dep_for(b.id(), "x");
        assert!(!Rc::ptr_eq(&dep_a, &dep_b));
    }

    #[test]
    fn remove_object_drops_all_keys() {
        let object = RawObject::new();
        let mut store = DepStore::new();
        store.dep_for(object.id(), "a");
        store.dep_for(object.id(), "b");

        let removed = store.remove_object(object.id()).expect("entry");
        assert_eq!(removed.len(), 2);
        assert_eq!(store.object_count(), 0);
        assert!(store.remove_object(object.id()).is_none());
    }
}
