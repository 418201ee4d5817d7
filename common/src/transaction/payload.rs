use serde::{Deserialize, Serialize};

use crate::{
    crypto::{Address, PublicKey},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

// Transfer of funds between two accounts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaymentPayload {
    // Key of the account paying; its address is debited amount + fee
    pub sender: PublicKey,
    pub recipient: Address,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: TimestampMillis,
}

impl Serializer for PaymentPayload {
    fn write(&self, writer: &mut Writer) {
        self.sender.write(writer);
        self.recipient.write(writer);
        writer.write_u64(&self.amount);
        writer.write_u64(&self.fee);
        writer.write_u64(&self.timestamp);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let sender = PublicKey::read(reader)?;
        let recipient = Address::read(reader)?;
        let amount = reader.read_u64()?;
        let fee = reader.read_u64()?;
        let timestamp = reader.read_u64()?;

        Ok(Self {
            sender,
            recipient,
            amount,
            fee,
            timestamp,
        })
    }

    fn size(&self) -> usize {
        self.sender.size() + self.recipient.size() + 8 + 8 + 8
    }
}

// Initial distribution entry, only valid in the first applied block
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GenesisPayload {
    pub recipient: Address,
    pub amount: u64,
    pub timestamp: TimestampMillis,
}

impl Serializer for GenesisPayload {
    fn write(&self, writer: &mut Writer) {
        self.recipient.write(writer);
        writer.write_u64(&self.amount);
        writer.write_u64(&self.timestamp);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let recipient = Address::read(reader)?;
        let amount = reader.read_u64()?;
        let timestamp = reader.read_u64()?;

        Ok(Self {
            recipient,
            amount,
            timestamp,
        })
    }

    fn size(&self) -> usize {
        self.recipient.size() + 8 + 8
    }
}
