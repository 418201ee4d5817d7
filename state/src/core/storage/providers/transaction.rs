use async_trait::async_trait;

use spos_common::{block::Height, crypto::Signature};

use crate::core::error::LedgerError;

// Index of committed transaction signatures, keyed by the height that
// included them. Entries disappear again when their height is rewound.
#[async_trait]
pub trait TransactionProvider {
    async fn get_included_height(
        &self,
        signature: &Signature,
    ) -> Result<Option<Height>, LedgerError>;

    async fn set_included_height(
        &mut self,
        signature: &Signature,
        height: Height,
    ) -> Result<(), LedgerError>;

    async fn remove_included(&mut self, signature: &Signature) -> Result<(), LedgerError>;

    // Height that included the signature, if it lies strictly below
    // `before_height`
    async fn is_included(
        &self,
        signature: &Signature,
        before_height: Option<Height>,
    ) -> Result<Option<Height>, LedgerError> {
        Ok(self
            .get_included_height(signature)
            .await?
            .filter(|height| before_height.map_or(true, |before| *height < before)))
    }
}
