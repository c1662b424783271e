//! Sorted associative container used by every grouping and sorting step of
//! the series orderer.
//!
//! The contract is the same at every call site:
//!
//!  - iteration always follows ascending key order, never insertion order
//!  - `put` on a key that is already present replaces the stored value
//!    (latest write wins)
//!
//! Callers that need append order use the current [`OrderedMap::len`] as the
//! next key. Keys only need [`PartialOrd`]; a key that does not compare equal
//! to itself (`f64::NAN`) is never matched and always inserts a new entry.

/// Map with unique keys kept in ascending order.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialOrd + Copy, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the first entry whose key is not less than `key`.
    fn lower_bound(&self, key: &K) -> usize {
        self.entries.partition_point(|(k, _)| k < key)
    }

    fn position(&self, key: &K) -> Option<usize> {
        let at = self.lower_bound(key);
        match self.entries.get(at) {
            Some((k, _)) if k == key => Some(at),
            _ => None,
        }
    }

    /// Insert `value` under `key`, returning the value it replaced.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Some(at) => Some(std::mem::replace(&mut self.entries[at].1, value)),
            None => {
                let at = self.lower_bound(&key);
                self.entries.insert(at, (key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).map(|at| &self.entries[at].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.position(key).map(move |at| &mut self.entries[at].1)
    }

    /// Value under `key`, inserting `default()` first when the key is absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let at = match self.position(&key) {
            Some(at) => at,
            None => {
                let at = self.lower_bound(&key);
                self.entries.insert(at, (key, default()));
                at
            }
        };
        &mut self.entries[at].1
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn ordered_keys(&self) -> Vec<K> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    /// Values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn into_values(self) -> impl Iterator<Item = V> {
        self.entries.into_iter().map(|(_, v)| v)
    }

    /// Forward iterator over `(key, value)` pairs that can be restarted.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            pos: 0,
        }
    }
}

/// Forward iterator returned by [`OrderedMap::iter`].
#[derive(Debug, Clone)]
pub struct Iter<'a, K, V> {
    entries: &'a [(K, V)],
    pos: usize,
}

impl<K, V> Iter<'_, K, V> {
    pub fn has_next(&self) -> bool {
        self.pos < self.entries.len()
    }

    /// Rewind to the smallest key.
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (k, v) = self.entries.get(self.pos)?;
        self.pos += 1;
        Some((k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}
