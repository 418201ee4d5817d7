use async_trait::async_trait;
use log::trace;

use spos_common::{block::Height, serializer::Serializer};

use crate::core::{
    error::LedgerError,
    storage::{
        constants::{EXTRA_TREE, STATE_HEIGHT},
        SledStorage, StateProvider,
    },
};

#[async_trait]
impl StateProvider for SledStorage {
    async fn get_state_height(&self) -> Result<Height, LedgerError> {
        trace!("get state height");
        Ok(self
            .load_optional_from_disk::<Height>(EXTRA_TREE, &self.extra, STATE_HEIGHT)?
            .unwrap_or(0))
    }

    async fn set_state_height(&mut self, height: Height) -> Result<(), LedgerError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("set state height to {}", height);
        }
        self.insert_into_snapshot(EXTRA_TREE, STATE_HEIGHT.to_vec(), height.to_bytes());
        Ok(())
    }
}
