mod constants;
mod providers;
mod snapshot;

pub mod sled;

pub use self::{providers::*, sled::SledStorage, snapshot::*};

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use log::{debug, trace, warn};

use spos_common::{
    block::Height,
    crypto::Address,
    transaction::Transaction,
};

use crate::core::error::LedgerError;

#[async_trait]
pub trait Storage:
    StateProvider + BalanceProvider + TransactionProvider + Send + Sync + 'static
{
    // Flush all writes buffered since the last commit as one durable
    // substrate version
    async fn commit(&mut self) -> Result<(), LedgerError>;

    // Discard all writes buffered since the last commit
    async fn rollback(&mut self) -> Result<(), LedgerError>;

    // Monotonically increasing commit counter of the substrate
    async fn store_version(&self) -> Result<u64, LedgerError>;

    // Balance recorded by the newest row of the account, 0 when the
    // account never changed
    async fn get_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        match self.get_last_state_height(address).await? {
            None | Some(0) => Ok(0),
            Some(height) => {
                let row = self
                    .get_balance_version(address, height)
                    .await?
                    .ok_or_else(|| LedgerError::MissingBalanceRow(address.clone(), height))?;
                Ok(row.get_balance())
            }
        }
    }

    // Effective balance at `at_height`: the minimum row balance seen while
    // walking the chain backward from the newest row down to and including
    // the first row at or below `at_height`. Funds received inside that
    // window are not spendable yet, hence the minimum. Reaching the end of
    // the chain without finding such a row means the account held nothing
    // at that height.
    async fn get_balance_at(
        &self,
        address: &Address,
        at_height: Height,
    ) -> Result<u64, LedgerError> {
        let mut height = match self.get_last_state_height(address).await? {
            None | Some(0) => return Ok(0),
            Some(height) => height,
        };

        let mut minimum = u64::MAX;
        loop {
            let row = self
                .get_balance_version(address, height)
                .await?
                .ok_or_else(|| LedgerError::MissingBalanceRow(address.clone(), height))?;
            minimum = minimum.min(row.get_balance());

            if height <= at_height {
                return Ok(minimum);
            }

            let previous = row.get_previous_height();
            if previous == 0 {
                // the whole chain lies above the requested height
                return Ok(0);
            }
            if previous >= height {
                return Err(LedgerError::CorruptedBalanceChain(address.clone(), height));
            }
            height = previous;
        }
    }

    // Spendable balance once `confirmations` blocks have passed on top
    async fn get_balance_with_confirmations(
        &self,
        address: &Address,
        confirmations: Height,
        height: Option<Height>,
    ) -> Result<u64, LedgerError> {
        let top = match height {
            Some(height) => height,
            None => self.get_state_height().await?,
        };
        let at_height = top.saturating_sub(confirmations).max(1);
        self.get_balance_at(address, at_height).await
    }

    // Deduplicated transactions touching the account, newest rows first
    async fn get_account_transactions(
        &self,
        address: &Address,
    ) -> Result<Vec<Arc<Transaction>>, LedgerError> {
        let mut transactions = Vec::new();
        let mut seen = HashSet::new();

        let mut current = self.get_last_state_height(address).await?;
        while let Some(height) = current.filter(|height| *height > 0) {
            let row = self
                .get_balance_version(address, height)
                .await?
                .ok_or_else(|| LedgerError::MissingBalanceRow(address.clone(), height))?;

            for tx in row.transactions() {
                if seen.insert(tx.get_signature().clone()) {
                    transactions.push(tx.clone());
                }
            }

            let previous = row.get_previous_height();
            if previous >= height {
                return Err(LedgerError::CorruptedBalanceChain(address.clone(), height));
            }
            current = Some(previous);
        }

        Ok(transactions)
    }

    // Newest transaction paid for by the account itself; transactions that
    // merely credit it do not count. Walks backward row by row and returns
    // the best match of the first row containing one.
    async fn get_last_sender_transaction(
        &self,
        address: &Address,
    ) -> Result<Option<Arc<Transaction>>, LedgerError> {
        let mut current = self.get_last_state_height(address).await?;
        while let Some(height) = current.filter(|height| *height > 0) {
            let row = self
                .get_balance_version(address, height)
                .await?
                .ok_or_else(|| LedgerError::MissingBalanceRow(address.clone(), height))?;

            let best = row
                .transactions()
                .filter(|tx| tx.get_sender_address().as_ref() == Some(address))
                .max_by(|a, b| {
                    a.get_timestamp()
                        .cmp(&b.get_timestamp())
                        .then_with(|| a.get_signature().cmp(b.get_signature()))
                });
            if let Some(tx) = best {
                return Ok(Some(tx.clone()));
            }

            let previous = row.get_previous_height();
            if previous >= height {
                return Err(LedgerError::CorruptedBalanceChain(address.clone(), height));
            }
            current = Some(previous);
        }

        Ok(None)
    }

    // Rewind every account to the newest row at or below `target`, remove
    // the included index of every dropped transaction, then move the state
    // height down. The caller commits.
    async fn rewind_to(&mut self, target: Height) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Debug) {
            debug!("rewind state to height {}", target);
        }

        for address in self.get_registered_addresses().await? {
            let mut current = self.get_last_state_height(&address).await?;
            while let Some(height) = current.filter(|height| *height > target) {
                if log::log_enabled!(log::Level::Trace) {
                    trace!("dropping row of {} at height {}", address, height);
                }

                let row = self
                    .get_balance_version(&address, height)
                    .await?
                    .ok_or_else(|| LedgerError::MissingBalanceRow(address.clone(), height))?;

                for tx in row.transactions() {
                    self.remove_included(tx.get_signature()).await?;
                }
                self.delete_balance_version(&address, height).await?;

                let previous = row.get_previous_height();
                if previous == 0 {
                    self.remove_last_state_height(&address).await?;
                    current = None;
                } else {
                    if previous >= height {
                        return Err(LedgerError::CorruptedBalanceChain(address.clone(), height));
                    }
                    self.set_last_state_height(&address, previous).await?;
                    current = Some(previous);
                }
            }
        }

        if log::log_enabled!(log::Level::Warn) {
            warn!("state rewound to height {}", target);
        }
        self.set_state_height(target).await
    }
}
