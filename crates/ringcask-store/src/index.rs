//! `Index`: in-memory hash table from composite key to [`RamControl`].
//!
//! Grounded on `kimberlite-storage`'s `rebuild_index_for_segment` for the
//! rebuild-by-scan shape, deliberately dropping the teacher's persisted
//! on-disk index file — the source spec treats this table as living only
//! for the process's lifetime, rebuilt fresh at every startup.

use std::collections::HashMap;
use std::sync::RwLock;

use ringcask_types::{CompositeKey, RamControl};

/// Hash table from `composite_key` to [`RamControl`]. Read-mostly: lookups
/// take a shared lock, `insert_or_replace`/`erase` take an exclusive one.
#[derive(Default)]
pub struct Index {
    table: RwLock<HashMap<CompositeKey, RamControl>>,
}

impl Index {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    pub fn lookup(&self, key: CompositeKey) -> Option<RamControl> {
        self.table
            .read()
            .expect("index read lock poisoned")
            .get(&key)
            .copied()
    }

    /// Inserts, or replaces a stale in-memory pointer for, `key`. Later
    /// writes supersede earlier ones — this is how a post-crash rebuild
    /// and a live overwrite converge on the same state.
    pub fn insert_or_replace(&self, key: CompositeKey, value: RamControl) {
        self.table
            .write()
            .expect("index write lock poisoned")
            .insert(key, value);
    }

    pub fn erase(&self, key: CompositeKey) -> Option<RamControl> {
        self.table
            .write()
            .expect("index write lock poisoned")
            .remove(&key)
    }

    pub fn len(&self) -> usize {
        self.table.read().expect("index read lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringcask_types::{BlobKind, Identifier};

    #[test]
    fn insert_then_lookup() {
        let index = Index::new();
        let key = CompositeKey::new(Identifier::ZERO, BlobKind::Data);
        index.insert_or_replace(key, RamControl::new(0, 10));
        assert_eq!(index.lookup(key), Some(RamControl::new(0, 10)));
    }

    #[test]
    fn later_insert_supersedes_earlier() {
        let index = Index::new();
        let key = CompositeKey::new(Identifier::ZERO, BlobKind::Data);
        index.insert_or_replace(key, RamControl::new(0, 10));
        index.insert_or_replace(key, RamControl::new(128, 20));
        assert_eq!(index.lookup(key), Some(RamControl::new(128, 20)));
    }

    #[test]
    fn erase_removes_entry() {
        let index = Index::new();
        let key = CompositeKey::new(Identifier::ZERO, BlobKind::Data);
        index.insert_or_replace(key, RamControl::new(0, 10));
        index.erase(key);
        assert_eq!(index.lookup(key), None);
    }
}
