mod providers;

use std::{
    collections::HashMap,
    path::Path,
    sync::Mutex,
};

use ::sled::Tree;
use log::{debug, trace, warn};

use spos_common::{
    crypto::Address,
    serializer::{Reader, ReaderError, Serializer, Writer},
};

use crate::core::{
    error::LedgerError,
    storage::{
        constants::{
            ACCOUNT_TREE_PREFIX, COMMIT_JOURNAL, EXTRA_TREE, INCLUDED_TXS_TREE, LAST_STATES_TREE,
            STORE_VERSION,
        },
        EntryState, Snapshot, Storage,
    },
};

use async_trait::async_trait;

// Durable description of one commit: the new store version and every
// buffered write, keyed by tree name. It is flushed to the extra tree
// before any target tree is touched, so that a crash mid-apply can be
// repaired by replaying it on the next open.
struct CommitJournal {
    version: u64,
    entries: Vec<(String, Vec<(Vec<u8>, Option<Vec<u8>>)>)>,
}

impl Serializer for CommitJournal {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.version);
        writer.write_u32(&(self.entries.len() as u32));
        for (tree, writes) in &self.entries {
            writer.write_string(tree);
            writer.write_u32(&(writes.len() as u32));
            for (key, value) in writes {
                writer.write_u32(&(key.len() as u32));
                writer.write_bytes(key);
                match value {
                    Some(value) => {
                        writer.write_bool(true);
                        writer.write_u32(&(value.len() as u32));
                        writer.write_bytes(value);
                    }
                    None => writer.write_bool(false),
                }
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let version = reader.read_u64()?;
        let trees = reader.read_u32()?;
        let mut entries = Vec::with_capacity(trees as usize);
        for _ in 0..trees {
            let tree = reader.read_string()?;
            let count = reader.read_u32()?;
            let mut writes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let key_len = reader.read_u32()? as usize;
                let key = reader.read_bytes(key_len)?;
                let value = if reader.read_bool()? {
                    let value_len = reader.read_u32()? as usize;
                    Some(reader.read_bytes(value_len)?)
                } else {
                    None
                };
                writes.push((key, value));
            }
            entries.push((tree, writes));
        }

        Ok(Self { version, entries })
    }
}

// State store substrate over sled. All writes go through the in-memory
// snapshot until commit; readers overlay the snapshot on the disk trees.
pub struct SledStorage {
    db: ::sled::Db,
    last_states: Tree,
    included_txs: Tree,
    extra: Tree,
    // Lazily opened per-account trees; sled keeps the handles alive until
    // the database closes
    account_trees: Mutex<HashMap<Address, Tree>>,
    snapshot: Snapshot,
    version: u64,
}

impl SledStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = ::sled::open(path)?;
        let last_states = db.open_tree(LAST_STATES_TREE)?;
        let included_txs = db.open_tree(INCLUDED_TXS_TREE)?;
        let extra = db.open_tree(EXTRA_TREE)?;

        let mut storage = Self {
            db,
            last_states,
            included_txs,
            extra,
            account_trees: Mutex::new(HashMap::new()),
            snapshot: Snapshot::new(),
            version: 0,
        };

        storage.version = match storage.extra.get(STORE_VERSION)? {
            Some(raw) => u64::from_bytes(&raw)?,
            None => 0,
        };

        // A prior process may have died between journal flush and tree
        // apply; replaying the journal repairs the half-written commit
        if let Some(raw) = storage.extra.get(COMMIT_JOURNAL)? {
            warn!("commit journal found on open, replaying interrupted commit");
            let journal = CommitJournal::from_bytes(&raw)?;
            storage.apply_journal(&journal)?;
            storage.extra.remove(COMMIT_JOURNAL)?;
            storage.db.flush()?;
            storage.version = journal.version;
        }

        if log::log_enabled!(log::Level::Debug) {
            debug!("substrate opened at version {}", storage.version);
        }
        Ok(storage)
    }

    pub(super) fn account_tree_name(address: &Address) -> String {
        format!("{}{}", ACCOUNT_TREE_PREFIX, address)
    }

    // Open (or fetch from the registry) the per-account tree
    pub(super) fn account_tree(&self, address: &Address) -> Result<Tree, LedgerError> {
        let mut cache = self
            .account_trees
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tree) = cache.get(address) {
            return Ok(tree.clone());
        }

        let tree = self.db.open_tree(Self::account_tree_name(address))?;
        cache.insert(address.clone(), tree.clone());
        Ok(tree)
    }

    fn tree_by_name(&self, name: &str) -> Result<Tree, LedgerError> {
        match name {
            LAST_STATES_TREE => Ok(self.last_states.clone()),
            INCLUDED_TXS_TREE => Ok(self.included_txs.clone()),
            EXTRA_TREE => Ok(self.extra.clone()),
            _ => Ok(self.db.open_tree(name)?),
        }
    }

    // Read a value through the snapshot overlay
    pub(super) fn load_optional_from_disk<T: Serializer>(
        &self,
        tree_name: &str,
        tree: &Tree,
        key: &[u8],
    ) -> Result<Option<T>, LedgerError> {
        match self.snapshot.get(tree_name, key) {
            EntryState::Stored(bytes) => Ok(Some(T::from_bytes(bytes)?)),
            EntryState::Deleted => Ok(None),
            EntryState::Absent => match tree.get(key)? {
                Some(bytes) => Ok(Some(T::from_bytes(&bytes)?)),
                None => Ok(None),
            },
        }
    }

    pub(super) fn insert_into_snapshot<K: Into<Vec<u8>>, V: Into<Vec<u8>>>(
        &mut self,
        tree_name: &str,
        key: K,
        value: V,
    ) {
        self.snapshot.insert(tree_name, key, value);
    }

    pub(super) fn remove_from_snapshot<K: Into<Vec<u8>>>(&mut self, tree_name: &str, key: K) {
        self.snapshot.remove(tree_name, key);
    }

    fn apply_journal(&self, journal: &CommitJournal) -> Result<(), LedgerError> {
        for (name, writes) in &journal.entries {
            let tree = self.tree_by_name(name)?;
            for (key, value) in writes {
                match value {
                    Some(value) => {
                        tree.insert(key.as_slice(), value.as_slice())?;
                    }
                    None => {
                        tree.remove(key.as_slice())?;
                    }
                }
            }
        }
        self.extra
            .insert(STORE_VERSION, journal.version.to_be_bytes().to_vec())?;
        Ok(())
    }
}

#[async_trait]
impl Storage for SledStorage {
    async fn commit(&mut self) -> Result<(), LedgerError> {
        if self.snapshot.is_empty() {
            trace!("nothing to commit");
            return Ok(());
        }

        let journal = CommitJournal {
            version: self.version + 1,
            entries: self
                .snapshot
                .iter()
                .map(|(tree, changes)| {
                    (
                        tree.clone(),
                        changes
                            .writes
                            .iter()
                            .map(|(key, value)| (key.clone(), value.clone()))
                            .collect(),
                    )
                })
                .collect(),
        };

        // Make the commit durable before touching any tree; everything
        // after this point can be replayed from the journal
        self.extra.insert(COMMIT_JOURNAL, journal.to_bytes())?;
        self.db.flush()?;

        self.apply_journal(&journal)?;
        self.extra.remove(COMMIT_JOURNAL)?;
        self.db.flush()?;

        self.version = journal.version;
        self.snapshot.clear();

        if log::log_enabled!(log::Level::Debug) {
            debug!("substrate committed version {}", self.version);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), LedgerError> {
        trace!("discarding uncommitted writes");
        self.snapshot.clear();
        Ok(())
    }

    async fn store_version(&self) -> Result<u64, LedgerError> {
        Ok(self.version)
    }
}
