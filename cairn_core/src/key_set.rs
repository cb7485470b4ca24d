use std::collections::HashSet;

use crate::Hash;

/// Mutable set of block keys.
///
/// Used for the GC live set and for visit-once bookkeeping while walking
/// DAGs that share sub-graphs. DAGs are acyclic by construction, so the set
/// only needs to avoid re-visiting nodes, not detect cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashSet<Hash>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, key: Hash) {
        self.keys.insert(key);
    }

    pub fn has(&self, key: &Hash) -> bool {
        self.keys.contains(key)
    }

    /// Adds `key` and returns `true` if it was not present yet.
    ///
    /// Traversals call this before descending into a child so each key is
    /// expanded at most once.
    pub fn visit(&mut self, key: Hash) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &Hash) -> bool {
        self.keys.remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hash> {
        self.keys.iter()
    }

    /// Keys in ascending byte order.
    pub fn to_sorted_vec(&self) -> Vec<Hash> {
        let mut keys: Vec<Hash> = self.keys.iter().copied().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<Hash> for KeySet {
    fn from_iter<I: IntoIterator<Item = Hash>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<Hash> for KeySet {
    fn extend<I: IntoIterator<Item = Hash>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}

impl IntoIterator for KeySet {
    type Item = Hash;
    type IntoIter = std::collections::hash_set::IntoIter<Hash>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Hash {
        Hash::from_bytes([b; 32])
    }

    #[test]
    fn visit_reports_first_insert_only() {
        let mut set = KeySet::new();
        assert!(set.visit(key(1)));
        assert!(!set.visit(key(1)));
        assert!(set.has(&key(1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn add_is_idempotent_and_remove_works() {
        let mut set = KeySet::new();
        set.add(key(2));
        set.add(key(2));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&key(2)));
        assert!(!set.remove(&key(2)));
        assert!(set.is_empty());
    }

    #[test]
    fn sorted_vec_is_ordered() {
        let set: KeySet = [key(3), key(1), key(2)].into_iter().collect();
        assert_eq!(set.to_sorted_vec(), vec![key(1), key(2), key(3)]);
    }
}
