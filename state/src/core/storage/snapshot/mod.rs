mod changes;

use std::collections::HashMap;

pub use changes::Changes;

/// Represents the state of an entry in the snapshot.
/// This provides a clearer API than using nested Option<Option<T>>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<T> {
    /// The entry has been added/modified in our snapshot
    Stored(T),
    /// The entry has been deleted in our snapshot
    Deleted,
    /// The entry is not present in our snapshot, must fallback on disk
    Absent,
}

impl<T> EntryState<T> {
    pub fn is_stored(&self) -> bool {
        matches!(self, EntryState::Stored(_))
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, EntryState::Deleted)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, EntryState::Absent)
    }
}

/// Snapshot is a transactional batch of changes that can be committed or
/// rolled back. It buffers every write since the last commit, organized by
/// tree name; nothing reaches the substrate until commit.
#[derive(Debug, Default)]
pub struct Snapshot {
    trees: HashMap<String, Changes>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }

    pub fn insert<K: Into<Vec<u8>>, V: Into<Vec<u8>>>(&mut self, tree: &str, key: K, value: V) {
        self.changes_mut(tree).insert(key, value);
    }

    pub fn remove<K: Into<Vec<u8>>>(&mut self, tree: &str, key: K) {
        self.changes_mut(tree).remove(key);
    }

    pub fn get(&self, tree: &str, key: &[u8]) -> EntryState<&[u8]> {
        match self.trees.get(tree) {
            Some(changes) => changes.get(key),
            None => EntryState::Absent,
        }
    }

    pub fn changes(&self, tree: &str) -> Option<&Changes> {
        self.trees.get(tree)
    }

    pub fn is_empty(&self) -> bool {
        self.trees.values().all(|changes| changes.writes.is_empty())
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Changes)> {
        self.trees.iter()
    }

    fn changes_mut(&mut self, tree: &str) -> &mut Changes {
        self.trees
            .entry(tree.to_owned())
            .or_insert_with(Changes::default)
    }
}
