mod chain;
mod storage;

use std::sync::Arc;

use tempdir::TempDir;

use spos_common::{
    block::{Block, SposData},
    crypto::{Address, KeyPair},
    time::TimestampMillis,
    transaction::Transaction,
};

use crate::core::{ledger::Ledger, storage::SledStorage};

pub(super) fn open_ledger(dir: &TempDir) -> Ledger<SledStorage> {
    let storage = SledStorage::open(dir.path().join("db")).expect("cannot open test substrate");
    Ledger::new(storage)
}

pub(super) fn address_of(keypair: &KeyPair) -> Address {
    Address::from_public_key(&keypair.get_public_key())
}

pub(super) fn test_block(
    forger: &KeyPair,
    timestamp: TimestampMillis,
    transactions: Vec<Arc<Transaction>>,
) -> Block {
    Block::new(
        timestamp,
        forger.get_public_key(),
        SposData::new(timestamp, 1_000, [7u8; 32]),
        transactions,
    )
}

pub(super) fn genesis_block(forger: &KeyPair, recipient: &Address, amount: u64) -> Block {
    let genesis = Arc::new(Transaction::new_genesis(recipient.clone(), amount, 0));
    test_block(forger, 1, vec![genesis])
}

pub(super) fn payment(
    sender: &KeyPair,
    recipient: &Address,
    amount: u64,
    fee: u64,
    timestamp: TimestampMillis,
) -> Arc<Transaction> {
    Arc::new(Transaction::new_payment(
        sender,
        recipient.clone(),
        amount,
        fee,
        timestamp,
    ))
}
