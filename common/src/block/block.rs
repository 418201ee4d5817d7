use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    block::SposData,
    config::MAX_BLOCK_TRANSACTIONS,
    crypto::{Address, Hashable, PublicKey},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
    transaction::Transaction,
};

// Block as handed to the state engine: the consensus header fragment, the
// forger identity and the sealed transaction set. Everything else a full
// node keeps per block (parents, difficulty, block signature) lives
// outside the state engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    timestamp: TimestampMillis,
    forger: PublicKey,
    consensus_data: SposData,
    transactions: Vec<Arc<Transaction>>,
}

impl Block {
    pub fn new(
        timestamp: TimestampMillis,
        forger: PublicKey,
        consensus_data: SposData,
        transactions: Vec<Arc<Transaction>>,
    ) -> Self {
        Self {
            timestamp,
            forger,
            consensus_data,
            transactions,
        }
    }

    pub fn get_timestamp(&self) -> TimestampMillis {
        self.timestamp
    }

    pub fn get_forger(&self) -> &PublicKey {
        &self.forger
    }

    pub fn get_consensus_data(&self) -> &SposData {
        &self.consensus_data
    }

    pub fn get_transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    // Consensus-defined distribution of this block's fees: the whole sum
    // is credited to the forger. Blocks without fee-bearing transactions
    // distribute nothing.
    pub fn fees_distribution(&self) -> IndexMap<Address, u64> {
        let total: u64 = self
            .transactions
            .iter()
            .map(|tx| tx.get_fee())
            .fold(0u64, u64::saturating_add);

        let mut distribution = IndexMap::new();
        if total > 0 {
            distribution.insert(Address::from_public_key(&self.forger), total);
        }
        distribution
    }
}

impl Serializer for Block {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.timestamp);
        self.forger.write(writer);
        self.consensus_data.write(writer);

        debug_assert!(self.transactions.len() <= MAX_BLOCK_TRANSACTIONS);
        writer.write_u16(self.transactions.len() as u16);
        for tx in &self.transactions {
            tx.write(writer);
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let timestamp = reader.read_u64()?;
        let forger = PublicKey::read(reader)?;
        let consensus_data = SposData::read(reader)?;

        let count = reader.read_u16()?;
        let mut transactions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            transactions.push(Arc::new(Transaction::read(reader)?));
        }

        Ok(Self {
            timestamp,
            forger,
            consensus_data,
            transactions,
        })
    }

    fn size(&self) -> usize {
        8 + self.forger.size()
            + self.consensus_data.size()
            + 2
            + self.transactions.iter().map(|tx| tx.size()).sum::<usize>()
    }
}

impl Hashable for Block {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_fees_go_to_forger() {
        let forger = KeyPair::new();
        let sender = KeyPair::new();
        let recipient = Address::from_public_key(&KeyPair::new().get_public_key());

        let txs = vec![
            Arc::new(Transaction::new_payment(&sender, recipient.clone(), 100, 10, 1)),
            Arc::new(Transaction::new_payment(&sender, recipient, 50, 5, 2)),
        ];
        let block = Block::new(
            3,
            forger.get_public_key(),
            SposData::new(1, 2, [0u8; 32]),
            txs,
        );

        let fees = block.fees_distribution();
        let forger_address = Address::from_public_key(&forger.get_public_key());
        assert_eq!(fees.get(&forger_address), Some(&15));
        assert_eq!(fees.len(), 1);
    }

    #[test]
    fn test_feeless_block_distributes_nothing() {
        let forger = KeyPair::new();
        let recipient = Address::from_public_key(&KeyPair::new().get_public_key());
        let block = Block::new(
            0,
            forger.get_public_key(),
            SposData::new(0, 0, [0u8; 32]),
            vec![Arc::new(Transaction::new_genesis(recipient, 1_000, 0))],
        );

        assert!(block.fees_distribution().is_empty());
    }

    #[test]
    fn test_serializer_round_trip() {
        let forger = KeyPair::new();
        let sender = KeyPair::new();
        let recipient = Address::from_public_key(&KeyPair::new().get_public_key());
        let block = Block::new(
            42,
            forger.get_public_key(),
            SposData::new(7, 9, [3u8; 32]),
            vec![Arc::new(Transaction::new_payment(&sender, recipient, 10, 1, 5))],
        );

        let decoded = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(block, decoded);
    }
}
