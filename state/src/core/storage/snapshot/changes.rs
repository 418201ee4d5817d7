use std::collections::BTreeMap;

use super::EntryState;

/// Changes represents a batch of write operations for a single tree.
/// It tracks insertions and deletions as pending changes before they are
/// applied to disk.
#[derive(Clone, Debug, Default)]
pub struct Changes {
    pub writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Changes {
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        self.writes.insert(key.into(), Some(value.into()));
    }

    pub fn remove<K>(&mut self, key: K)
    where
        K: Into<Vec<u8>>,
    {
        self.writes.insert(key.into(), None);
    }

    pub fn get(&self, key: &[u8]) -> EntryState<&[u8]> {
        match self.writes.get(key) {
            Some(Some(value)) => EntryState::Stored(value.as_slice()),
            Some(None) => EntryState::Deleted,
            None => EntryState::Absent,
        }
    }

    // Keys written (not deleted) in this batch
    pub fn stored_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.writes
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|_| key.as_slice()))
    }

    pub fn is_deleted(&self, key: &[u8]) -> bool {
        matches!(self.writes.get(key), Some(None))
    }
}
