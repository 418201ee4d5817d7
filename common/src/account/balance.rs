use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    block::Height,
    serializer::{Reader, ReaderError, Serializer, Writer},
    transaction::Transaction,
};

// Reason a balance changed at some height: a share of the block fees
// credited by consensus, or a transaction touching the account.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalanceChange {
    FeeCredit(u64),
    Transaction(Arc<Transaction>),
}

impl BalanceChange {
    pub fn as_transaction(&self) -> Option<&Arc<Transaction>> {
        match self {
            BalanceChange::Transaction(tx) => Some(tx),
            BalanceChange::FeeCredit(_) => None,
        }
    }
}

impl Serializer for BalanceChange {
    fn write(&self, writer: &mut Writer) {
        match self {
            BalanceChange::FeeCredit(amount) => {
                writer.write_u8(0);
                writer.write_u64(amount);
            }
            BalanceChange::Transaction(tx) => {
                writer.write_u8(1);
                tx.write(writer);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(BalanceChange::FeeCredit(reader.read_u64()?)),
            1 => Ok(BalanceChange::Transaction(Arc::new(Transaction::read(reader)?))),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1 + match self {
            BalanceChange::FeeCredit(_) => 8,
            BalanceChange::Transaction(tx) => tx.size(),
        }
    }
}

/// Per-height record of an account's balance.
///
/// Rows of one account form a backward chain through `previous_height`;
/// `previous_height == 0` marks the oldest row, since rows only ever live
/// at heights >= 1.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VersionedBalance {
    balance: u64,
    changes: Vec<BalanceChange>,
    previous_height: Height,
}

impl VersionedBalance {
    pub fn new(balance: u64, changes: Vec<BalanceChange>, previous_height: Height) -> Self {
        Self {
            balance,
            changes,
            previous_height,
        }
    }

    pub fn get_balance(&self) -> u64 {
        self.balance
    }

    pub fn get_changes(&self) -> &[BalanceChange] {
        &self.changes
    }

    pub fn get_previous_height(&self) -> Height {
        self.previous_height
    }

    // Transactions recorded in this row, in reason-list order
    pub fn transactions(&self) -> impl Iterator<Item = &Arc<Transaction>> {
        self.changes.iter().filter_map(BalanceChange::as_transaction)
    }
}

impl Serializer for VersionedBalance {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.balance);
        debug_assert!(self.changes.len() <= u16::MAX as usize);
        writer.write_u16(self.changes.len() as u16);
        for change in &self.changes {
            change.write(writer);
        }
        writer.write_u32(&self.previous_height);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let balance = reader.read_u64()?;
        let count = reader.read_u16()?;
        let mut changes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            changes.push(BalanceChange::read(reader)?);
        }
        let previous_height = reader.read_u32()?;

        Ok(Self {
            balance,
            changes,
            previous_height,
        })
    }

    fn size(&self) -> usize {
        8 + 2 + self.changes.iter().map(Serializer::size).sum::<usize>() + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Address, KeyPair};

    #[test]
    fn test_round_trip() {
        let keypair = KeyPair::new();
        let recipient = Address::from_public_key(&KeyPair::new().get_public_key());
        let tx = Arc::new(Transaction::new_payment(&keypair, recipient, 50, 5, 77));

        let row = VersionedBalance::new(
            945,
            vec![BalanceChange::Transaction(tx), BalanceChange::FeeCredit(5)],
            3,
        );

        let decoded = VersionedBalance::from_bytes(&row.to_bytes()).unwrap();
        assert_eq!(row, decoded);
        assert_eq!(row.size(), row.to_bytes().len());
        assert_eq!(decoded.transactions().count(), 1);
    }
}
