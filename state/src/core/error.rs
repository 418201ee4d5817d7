use thiserror::Error;

use spos_common::{
    block::Height,
    crypto::{Address, Signature},
    serializer::ReaderError,
    transaction::ValidationError,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Transaction {0} is already included in the chain")]
    DuplicateTransaction(Signature),

    #[error("Applying the block would leave account {0} at balance {1}")]
    NegativeBalance(Address, i128),

    #[error("Balance overflow for account {0}")]
    BalanceOverflow(Address),

    #[error("State height overflow")]
    HeightOverflow,

    // The transaction sum is closed today; this survives for wire
    // compatibility when a block carries a kind this build cannot apply
    #[error("Unknown transaction variant")]
    UnknownTransactionVariant,

    #[error("Invalid signature on transaction {0}")]
    InvalidSignature(Signature),

    #[error("Invalid transaction fields: {0}")]
    InvalidFields(#[from] ValidationError),

    #[error("Missing balance row for account {0} at height {1}")]
    MissingBalanceRow(Address, Height),

    #[error("Balance chain of account {0} does not strictly decrease at height {1}")]
    CorruptedBalanceChain(Address, Height),

    #[error("Error on substrate: {0}")]
    Substrate(#[from] sled::Error),

    #[error("Error while reading from disk: {0}")]
    Corrupted(#[from] ReaderError),
}
