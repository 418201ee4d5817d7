use std::{collections::BTreeMap, sync::Arc};

use indexmap::IndexMap;
use log::{debug, error, trace, warn};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use spos_common::{
    account::{BalanceChange, VersionedBalance},
    block::{Block, Height},
    crypto::{hash, Address, Hash, Signature},
    transaction::Transaction,
};

use crate::core::{error::LedgerError, filter, storage::Storage};

/// The state store facade.
///
/// Owns the substrate behind a single writer lock: block application and
/// rollback are exclusive, balance queries and admission filtering run
/// concurrently on a coherent snapshot.
pub struct Ledger<S: Storage> {
    storage: RwLock<S>,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage: RwLock::new(storage),
        }
    }

    pub fn get_storage(&self) -> &RwLock<S> {
        &self.storage
    }

    // Apply a block on top of the current height. All writes commit as one
    // substrate transaction; on any error the store is left untouched.
    pub async fn process_block(&self, block: &Block) -> Result<(), LedgerError> {
        let mut storage = self.storage.write().await;
        let result = Self::apply_block(&mut *storage, block).await;
        if result.is_err() {
            // drop whatever was buffered so the next writer starts clean
            if let Err(e) = storage.rollback().await {
                error!("cannot discard buffered writes after failed block: {}", e);
            }
        }
        result
    }

    async fn apply_block(storage: &mut S, block: &Block) -> Result<(), LedgerError> {
        let transactions = block.get_transactions();
        if log::log_enabled!(log::Level::Debug) {
            debug!("processing block with {} transactions", transactions.len());
        }

        // Refuse blocks carrying a transaction the chain already holds, a
        // bad signature or nonsense fields
        for tx in transactions {
            if !tx.verify_signature() {
                return Err(LedgerError::InvalidSignature(tx.get_signature().clone()));
            }
            tx.validate_fields()?;
            if storage.get_included_height(tx.get_signature()).await?.is_some() {
                return Err(LedgerError::DuplicateTransaction(tx.get_signature().clone()));
            }
        }

        // Start from the consensus fee distribution, then fold in every
        // transaction delta. Balances are folded in 128-bit arithmetic and
        // only narrowed after the non-negativity check.
        let mut new_balances: IndexMap<Address, (i128, Vec<BalanceChange>)> = IndexMap::new();
        for (address, amount) in block.fees_distribution() {
            let current = storage.get_balance(&address).await? as i128;
            new_balances.insert(
                address,
                (current + amount as i128, vec![BalanceChange::FeeCredit(amount)]),
            );
        }

        for tx in transactions {
            for (address, _) in tx.get_balance_changes() {
                if !new_balances.contains_key(&address) {
                    let current = storage.get_balance(&address).await? as i128;
                    new_balances.insert(address, (current, Vec::new()));
                }
            }
        }
        for tx in transactions {
            for (address, delta) in tx.get_balance_changes() {
                if let Some((balance, changes)) = new_balances.get_mut(&address) {
                    *balance += delta;
                    // newest reason first
                    changes.insert(0, BalanceChange::Transaction(tx.clone()));
                }
            }
        }

        for (address, (balance, _)) in &new_balances {
            if *balance < 0 {
                warn!("rejecting block: {} would end up at {}", address, balance);
                return Err(LedgerError::NegativeBalance(address.clone(), *balance));
            }
            if *balance > u64::MAX as i128 {
                return Err(LedgerError::BalanceOverflow(address.clone()));
            }
        }

        let height = storage.get_state_height().await?;
        let new_height = height.checked_add(1).ok_or(LedgerError::HeightOverflow)?;

        for (address, (balance, changes)) in new_balances {
            let previous = storage.get_last_state_height(&address).await?.unwrap_or(0);
            let row = VersionedBalance::new(balance as u64, changes, previous);
            storage.set_balance_version(&address, new_height, &row).await?;
            storage.set_last_state_height(&address, new_height).await?;
        }
        for tx in transactions {
            storage.set_included_height(tx.get_signature(), new_height).await?;
        }
        storage.set_state_height(new_height).await?;

        storage.commit().await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("state advanced to height {}", new_height);
        }
        Ok(())
    }

    // Rewind the state to the exact snapshot that existed at `target`.
    // A target at or above the current height is a no-op.
    pub async fn rollback_to(&self, target: Height) -> Result<(), LedgerError> {
        let mut storage = self.storage.write().await;
        if target >= storage.get_state_height().await? {
            trace!("rollback target {} not below current height, nothing to do", target);
            return Ok(());
        }

        let result = async {
            storage.rewind_to(target).await?;
            storage.commit().await
        }
        .await;
        if result.is_err() {
            if let Err(e) = storage.rollback().await {
                error!("cannot discard buffered writes after failed rollback: {}", e);
            }
        }
        result
    }

    // Admission filter over a read snapshot; see the filter module
    pub async fn validate(
        &self,
        candidates: &[Arc<Transaction>],
        height: Option<Height>,
    ) -> Result<Vec<Arc<Transaction>>, LedgerError> {
        let storage = self.storage.read().await;
        filter::validate(&*storage, candidates, height).await
    }

    pub async fn get_state_height(&self) -> Result<Height, LedgerError> {
        self.storage.read().await.get_state_height().await
    }

    pub async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        self.storage.read().await.get_balance(address).await
    }

    pub async fn get_balance_at(
        &self,
        address: &Address,
        at_height: Height,
    ) -> Result<u64, LedgerError> {
        self.storage.read().await.get_balance_at(address, at_height).await
    }

    pub async fn get_balance_with_confirmations(
        &self,
        address: &Address,
        confirmations: Height,
        height: Option<Height>,
    ) -> Result<u64, LedgerError> {
        self.storage
            .read()
            .await
            .get_balance_with_confirmations(address, confirmations, height)
            .await
    }

    pub async fn get_account_transactions(
        &self,
        address: &Address,
    ) -> Result<Vec<Arc<Transaction>>, LedgerError> {
        self.storage.read().await.get_account_transactions(address).await
    }

    pub async fn is_included(&self, signature: &Signature) -> Result<Option<Height>, LedgerError> {
        self.storage.read().await.is_included(signature, None).await
    }

    // Dump of all non-zero balances, keyed by address text
    pub async fn to_json(&self) -> Result<Value, LedgerError> {
        let storage = self.storage.read().await;

        let mut balances = BTreeMap::new();
        for address in storage.get_registered_addresses().await? {
            let balance = storage.get_balance(&address).await?;
            if balance > 0 {
                balances.insert(address.to_string(), balance);
            }
        }

        Ok(json!(balances))
    }

    // Coarse checksum of the textual balance dump. Only meant for log
    // correlation between nodes, never for consensus.
    pub async fn ledger_hash(&self) -> Result<Hash, LedgerError> {
        let dump = self.to_json().await?;
        Ok(hash(dump.to_string().as_bytes()))
    }
}
