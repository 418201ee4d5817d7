use async_trait::async_trait;

use spos_common::{account::VersionedBalance, block::Height, crypto::Address};

use crate::core::error::LedgerError;

// Access to the per-account balance rows and the last-change pointers.
//
// Every account owns a chain of `VersionedBalance` rows linked backward by
// `previous_height`; `get_last_state_height` points at the newest row.
#[async_trait]
pub trait BalanceProvider {
    async fn get_last_state_height(
        &self,
        address: &Address,
    ) -> Result<Option<Height>, LedgerError>;

    async fn set_last_state_height(
        &mut self,
        address: &Address,
        height: Height,
    ) -> Result<(), LedgerError>;

    async fn remove_last_state_height(&mut self, address: &Address) -> Result<(), LedgerError>;

    async fn get_balance_version(
        &self,
        address: &Address,
        height: Height,
    ) -> Result<Option<VersionedBalance>, LedgerError>;

    async fn set_balance_version(
        &mut self,
        address: &Address,
        height: Height,
        version: &VersionedBalance,
    ) -> Result<(), LedgerError>;

    async fn delete_balance_version(
        &mut self,
        address: &Address,
        height: Height,
    ) -> Result<(), LedgerError>;

    // All addresses currently holding a last-change pointer
    async fn get_registered_addresses(&self) -> Result<Vec<Address>, LedgerError>;
}
