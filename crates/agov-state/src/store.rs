//! # Generic In-Memory Store
//!
//! Thread-safe, cloneable key-value store. `parking_lot::RwLock` is
//! non-poisoning, so a panicking writer does not permanently wedge the
//! store.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe, cloneable keyed store.
#[derive(Debug)]
pub struct Store<K, V> {
    data: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert only if the key is absent. Returns `true` if inserted.
    pub fn insert_if_absent(&self, key: K, value: V) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Project a record without cloning all of it.
    pub fn read<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.data.read().get(key).map(f)
    }

    /// All records matching a predicate.
    pub fn filter(&self, mut pred: impl FnMut(&V) -> bool) -> Vec<V> {
        self.data
            .read()
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure may inspect the current state, validate preconditions,
    /// mutate the record, and return `Ok(R)` or `Err(E)`. The whole
    /// operation runs under one write lock, so there is no window between
    /// the check and the update.
    ///
    /// Returns `None` if the record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first() {
        let store: Store<&str, u32> = Store::new();
        assert!(store.insert_if_absent("a", 1));
        assert!(!store.insert_if_absent("a", 2));
        assert_eq!(store.get(&"a"), Some(1));
    }

    #[test]
    fn clones_share_data() {
        let store: Store<&str, u32> = Store::new();
        let other = store.clone();
        store.insert("a", 1);
        assert_eq!(other.get(&"a"), Some(1));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn try_update_runs_closure_atomically() {
        let store: Store<&str, u32> = Store::new();
        store.insert("a", 1);
        let r: Option<Result<u32, &str>> = store.try_update(&"a", |v| {
            *v += 1;
            Ok(*v)
        });
        assert_eq!(r, Some(Ok(2)));
        let r: Option<Result<(), &str>> = store.try_update(&"a", |_| Err("no"));
        assert_eq!(r, Some(Err("no")));
        assert_eq!(store.get(&"a"), Some(2));
        let r: Option<Result<(), &str>> = store.try_update(&"missing", |_| Ok(()));
        assert!(r.is_none());
    }

    #[test]
    fn read_and_filter() {
        let store: Store<u8, u32> = Store::new();
        for i in 0..5 {
            store.insert(i, u32::from(i) * 10);
        }
        assert_eq!(store.read(&3, |v| v + 1), Some(31));
        let mut big = store.filter(|v| *v >= 20);
        big.sort_unstable();
        assert_eq!(big, vec![20, 30, 40]);
        assert!(!store.is_empty());
    }
}
