use std::collections::hash_map::{Entry, HashMap};
use std::hash::Hash;

/// Identity-keyed, in-memory record cache.
///
/// Records enter through [`insert`](Self::insert) or
/// [`get_or_try_insert_with`](Self::get_or_try_insert_with) and leave only
/// through [`evict`](Self::evict). Nothing expires on its own.
#[derive(Debug)]
pub struct RecordCache<K, V> {
    records: HashMap<K, V>,
}

impl<K, V> Default for RecordCache<K, V> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<K, V> RecordCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.records.get_mut(key)
    }

    /// Returns the cached record, materializing it with `load` on a miss.
    /// A failed load leaves the cache unchanged.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, load: F) -> Result<&mut V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        match self.records.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let record = load(entry.key())?;
                Ok(entry.insert(record))
            }
        }
    }

    /// Stores `record`, returning the one it replaced.
    pub fn insert(&mut self, key: K, record: V) -> Option<V> {
        self.records.insert(key, record)
    }

    pub fn evict(&mut self, key: &K) -> Option<V> {
        self.records.remove(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
