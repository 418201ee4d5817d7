use async_trait::async_trait;

use spos_common::block::Height;

use crate::core::error::LedgerError;

// Chain-level metadata of the state store
#[async_trait]
pub trait StateProvider {
    // Number of applied blocks; 0 on a fresh store
    async fn get_state_height(&self) -> Result<Height, LedgerError>;

    async fn set_state_height(&mut self, height: Height) -> Result<(), LedgerError>;
}
