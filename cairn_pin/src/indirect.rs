use std::collections::HashMap;

use cairn_core::Hash;

/// Reference counts for keys protected by recursive pins.
///
/// A key is present iff its count is at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndirectPins {
    refs: HashMap<Hash, u64>,
}

impl IndirectPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_refs(refs: HashMap<Hash, u64>) -> Self {
        let refs = refs.into_iter().filter(|(_, n)| *n > 0).collect();
        Self { refs }
    }

    /// Adds one reference to `key`. On overflow the count is left as is and
    /// the key is returned as the error.
    pub fn increment(&mut self, key: Hash) -> Result<(), Hash> {
        self.increment_by(key, 1)
    }

    pub fn increment_by(&mut self, key: Hash, n: u64) -> Result<(), Hash> {
        if n == 0 {
            return Ok(());
        }
        let total = self.count(&key).checked_add(n).ok_or(key)?;
        self.refs.insert(key, total);
        Ok(())
    }

    /// Adds every count in `refs`, or none of them if any would overflow.
    pub fn increment_all(&mut self, refs: &HashMap<Hash, u64>) -> Result<(), Hash> {
        for (key, n) in refs {
            if self.count(key).checked_add(*n).is_none() {
                return Err(*key);
            }
        }
        for (key, n) in refs {
            self.increment_by(*key, *n)?;
        }
        Ok(())
    }

    /// Decrements `key`, dropping the entry once it reaches zero.
    /// Decrementing an absent key is a no-op.
    pub fn decrement(&mut self, key: &Hash) {
        self.decrement_by(key, 1);
    }

    pub fn decrement_by(&mut self, key: &Hash, n: u64) {
        if let Some(count) = self.refs.get_mut(key) {
            if *count <= n {
                self.refs.remove(key);
            } else {
                *count -= n;
            }
        }
    }

    pub fn has(&self, key: &Hash) -> bool {
        self.refs.contains_key(key)
    }

    pub fn count(&self, key: &Hash) -> u64 {
        self.refs.get(key).copied().unwrap_or(0)
    }

    pub fn refs(&self) -> &HashMap<Hash, u64> {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> Hash {
        Hash::from_bytes([b; 32])
    }

    #[test]
    fn entry_disappears_at_zero() {
        let mut pins = IndirectPins::new();
        pins.increment(key(1)).unwrap();
        pins.increment(key(1)).unwrap();
        assert_eq!(pins.count(&key(1)), 2);

        pins.decrement(&key(1));
        assert!(pins.has(&key(1)));
        pins.decrement(&key(1));
        assert!(!pins.has(&key(1)));
        assert!(pins.is_empty());
    }

    #[test]
    fn decrement_absent_is_noop() {
        let mut pins = IndirectPins::new();
        pins.decrement(&key(9));
        assert!(pins.is_empty());
    }

    #[test]
    fn decrement_by_more_than_count_removes() {
        let mut pins = IndirectPins::new();
        pins.increment_by(key(2), 3).unwrap();
        pins.decrement_by(&key(2), 5);
        assert!(!pins.has(&key(2)));
    }

    #[test]
    fn overflowing_increment_leaves_counts_alone() {
        let mut pins = IndirectPins::from_refs(HashMap::from([(key(1), u64::MAX - 1)]));
        assert_eq!(pins.increment_by(key(1), 2), Err(key(1)));
        assert_eq!(pins.count(&key(1)), u64::MAX - 1);

        let batch = HashMap::from([(key(2), 1), (key(1), 5)]);
        assert_eq!(pins.increment_all(&batch), Err(key(1)));
        assert!(!pins.has(&key(2)));
        assert_eq!(pins.count(&key(1)), u64::MAX - 1);

        pins.increment(key(1)).unwrap();
        assert_eq!(pins.count(&key(1)), u64::MAX);
    }

    #[test]
    fn zero_counts_are_dropped_on_construction() {
        let refs = HashMap::from([(key(1), 0), (key(2), 4)]);
        let pins = IndirectPins::from_refs(refs);
        assert_eq!(pins.len(), 1);
        assert_eq!(pins.count(&key(2)), 4);
    }
}
