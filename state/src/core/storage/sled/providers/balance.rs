use std::collections::BTreeSet;

use async_trait::async_trait;
use log::trace;

use spos_common::{
    account::VersionedBalance,
    block::Height,
    crypto::Address,
    serializer::{ReaderError, Serializer},
};

use crate::core::{
    error::LedgerError,
    storage::{constants::LAST_STATES_TREE, BalanceProvider, SledStorage},
};

fn parse_address(key: &[u8]) -> Result<Address, LedgerError> {
    let text = std::str::from_utf8(key).map_err(|_| ReaderError::InvalidString)?;
    text.parse::<Address>()
        .map_err(|_| LedgerError::Corrupted(ReaderError::InvalidValue))
}

#[async_trait]
impl BalanceProvider for SledStorage {
    async fn get_last_state_height(
        &self,
        address: &Address,
    ) -> Result<Option<Height>, LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get last state height for {}", address);
        }
        self.load_optional_from_disk::<Height>(
            LAST_STATES_TREE,
            &self.last_states,
            address.as_str().as_bytes(),
        )
    }

    async fn set_last_state_height(
        &mut self,
        address: &Address,
        height: Height,
    ) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("set last state height for {} at {}", address, height);
        }
        self.insert_into_snapshot(
            LAST_STATES_TREE,
            address.as_str().as_bytes().to_vec(),
            height.to_bytes(),
        );
        Ok(())
    }

    async fn remove_last_state_height(&mut self, address: &Address) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("remove last state height for {}", address);
        }
        self.remove_from_snapshot(LAST_STATES_TREE, address.as_str().as_bytes().to_vec());
        Ok(())
    }

    async fn get_balance_version(
        &self,
        address: &Address,
        height: Height,
    ) -> Result<Option<VersionedBalance>, LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get balance version for {} at height {}", address, height);
        }
        let tree = self.account_tree(address)?;
        self.load_optional_from_disk::<VersionedBalance>(
            &Self::account_tree_name(address),
            &tree,
            &height.to_be_bytes(),
        )
    }

    async fn set_balance_version(
        &mut self,
        address: &Address,
        height: Height,
        version: &VersionedBalance,
    ) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "set balance version for {} at height {}: {}",
                address,
                height,
                version.get_balance()
            );
        }
        self.insert_into_snapshot(
            &Self::account_tree_name(address),
            height.to_be_bytes().to_vec(),
            version.to_bytes(),
        );
        Ok(())
    }

    async fn delete_balance_version(
        &mut self,
        address: &Address,
        height: Height,
    ) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("delete balance version for {} at height {}", address, height);
        }
        self.remove_from_snapshot(
            &Self::account_tree_name(address),
            height.to_be_bytes().to_vec(),
        );
        Ok(())
    }

    async fn get_registered_addresses(&self) -> Result<Vec<Address>, LedgerError> {
        trace!("get registered addresses");

        // Merge the disk view with the pending snapshot so callers see a
        // coherent key set mid-transaction
        let changes = self.snapshot.changes(LAST_STATES_TREE);
        let mut keys = BTreeSet::new();

        for item in self.last_states.iter() {
            let (key, _) = item?;
            if changes.map_or(false, |changes| changes.is_deleted(&key)) {
                continue;
            }
            keys.insert(key.to_vec());
        }
        if let Some(changes) = changes {
            for key in changes.stored_keys() {
                keys.insert(key.to_vec());
            }
        }

        keys.iter().map(|key| parse_address(key)).collect()
    }
}
