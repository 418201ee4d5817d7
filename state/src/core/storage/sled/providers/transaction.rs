use async_trait::async_trait;
use log::trace;

use spos_common::{
    block::Height,
    crypto::Signature,
    serializer::Serializer,
};

use crate::core::{
    error::LedgerError,
    storage::{constants::INCLUDED_TXS_TREE, SledStorage, TransactionProvider},
};

#[async_trait]
impl TransactionProvider for SledStorage {
    async fn get_included_height(
        &self,
        signature: &Signature,
    ) -> Result<Option<Height>, LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get included height for {}", signature);
        }
        self.load_optional_from_disk::<Height>(
            INCLUDED_TXS_TREE,
            &self.included_txs,
            signature.as_bytes(),
        )
    }

    async fn set_included_height(
        &mut self,
        signature: &Signature,
        height: Height,
    ) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("set included height for {} at {}", signature, height);
        }
        self.insert_into_snapshot(
            INCLUDED_TXS_TREE,
            signature.as_bytes().to_vec(),
            height.to_bytes(),
        );
        Ok(())
    }

    async fn remove_included(&mut self, signature: &Signature) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("remove included transaction {}", signature);
        }
        self.remove_from_snapshot(INCLUDED_TXS_TREE, signature.as_bytes().to_vec());
        Ok(())
    }
}
