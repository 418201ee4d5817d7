use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    crypto::{hash, Address, Hashable, KeyPair, Signature, SIGNATURE_SIZE},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

mod payload;

pub use payload::{GenesisPayload, PaymentPayload};

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Transaction amount must be strictly positive")]
    ZeroAmount,

    #[error("Transaction fee must be strictly positive")]
    ZeroFee,

    #[error("Recipient address is malformed")]
    MalformedRecipient,
}

// All kinds of transaction the ledger understands.
// This is a closed sum: adding a kind is a source change with exhaustive
// matching everywhere.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment(PaymentPayload),
    Genesis(GenesisPayload),
}

impl Serializer for TransactionType {
    fn write(&self, writer: &mut Writer) {
        match self {
            TransactionType::Payment(payload) => {
                writer.write_u8(0);
                payload.write(writer);
            }
            TransactionType::Genesis(payload) => {
                writer.write_u8(1);
                payload.write(writer);
            }
        }
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(TransactionType::Payment(PaymentPayload::read(reader)?)),
            1 => Ok(TransactionType::Genesis(GenesisPayload::read(reader)?)),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1 + match self {
            TransactionType::Payment(payload) => payload.size(),
            TransactionType::Genesis(payload) => payload.size(),
        }
    }
}

// Transaction as carried by blocks and validated by the admission filter.
// The signature bytes are the transaction's unique identity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    data: TransactionType,
    signature: Signature,
}

impl Transaction {
    pub fn new(data: TransactionType, signature: Signature) -> Self {
        Self { data, signature }
    }

    // Build and sign a payment from the sender's key pair
    pub fn new_payment(
        keypair: &KeyPair,
        recipient: Address,
        amount: u64,
        fee: u64,
        timestamp: TimestampMillis,
    ) -> Self {
        let data = TransactionType::Payment(PaymentPayload {
            sender: keypair.get_public_key(),
            recipient,
            amount,
            fee,
            timestamp,
        });
        let signature = keypair.sign(&data.to_bytes());
        Self { data, signature }
    }

    // Build a genesis entry; no account signs it, so its identity is a
    // deterministic digest of the payload
    pub fn new_genesis(recipient: Address, amount: u64, timestamp: TimestampMillis) -> Self {
        let data = TransactionType::Genesis(GenesisPayload {
            recipient,
            amount,
            timestamp,
        });
        let signature = Self::genesis_signature(&data);
        Self { data, signature }
    }

    fn genesis_signature(data: &TransactionType) -> Signature {
        let first = hash(&data.to_bytes());
        let second = hash(first.as_bytes());

        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..32].copy_from_slice(first.as_bytes());
        bytes[32..].copy_from_slice(second.as_bytes());
        Signature::new(bytes)
    }

    pub fn get_data(&self) -> &TransactionType {
        &self.data
    }

    pub fn get_signature(&self) -> &Signature {
        &self.signature
    }

    pub fn get_timestamp(&self) -> TimestampMillis {
        match &self.data {
            TransactionType::Payment(payload) => payload.timestamp,
            TransactionType::Genesis(payload) => payload.timestamp,
        }
    }

    pub fn get_fee(&self) -> u64 {
        match &self.data {
            TransactionType::Payment(payload) => payload.fee,
            TransactionType::Genesis(_) => 0,
        }
    }

    pub fn get_amount(&self) -> u64 {
        match &self.data {
            TransactionType::Payment(payload) => payload.amount,
            TransactionType::Genesis(payload) => payload.amount,
        }
    }

    // Address of the account paying for this transaction.
    // Genesis entries have no payer.
    pub fn get_sender_address(&self) -> Option<Address> {
        match &self.data {
            TransactionType::Payment(payload) => Some(Address::from_public_key(&payload.sender)),
            TransactionType::Genesis(_) => None,
        }
    }

    pub fn is_payment(&self) -> bool {
        matches!(self.data, TransactionType::Payment(_))
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.data, TransactionType::Genesis(_))
    }

    // Signed balance deltas this transaction applies, one pair per touched
    // account. Deltas are folded in 128-bit arithmetic by the caller so a
    // hostile amount + fee pair cannot overflow on the way.
    pub fn get_balance_changes(&self) -> Vec<(Address, i128)> {
        match &self.data {
            TransactionType::Payment(payload) => {
                let debit = payload.amount as i128 + payload.fee as i128;
                vec![
                    (Address::from_public_key(&payload.sender), -debit),
                    (payload.recipient.clone(), payload.amount as i128),
                ]
            }
            TransactionType::Genesis(payload) => {
                vec![(payload.recipient.clone(), payload.amount as i128)]
            }
        }
    }

    // Check the signature against the serialized payload.
    // Genesis entries carry a recomputable digest instead of a signature.
    pub fn verify_signature(&self) -> bool {
        match &self.data {
            TransactionType::Payment(payload) => payload
                .sender
                .verify_signature(&self.data.to_bytes(), &self.signature),
            TransactionType::Genesis(_) => {
                Self::genesis_signature(&self.data) == self.signature
            }
        }
    }

    // Field-level checks that do not need any chain state
    pub fn validate_fields(&self) -> Result<(), ValidationError> {
        match &self.data {
            TransactionType::Payment(payload) => {
                if payload.amount == 0 {
                    return Err(ValidationError::ZeroAmount);
                }
                if payload.fee == 0 {
                    return Err(ValidationError::ZeroFee);
                }
                if !payload.recipient.is_well_formed() {
                    return Err(ValidationError::MalformedRecipient);
                }
            }
            TransactionType::Genesis(payload) => {
                if payload.amount == 0 {
                    return Err(ValidationError::ZeroAmount);
                }
                if !payload.recipient.is_well_formed() {
                    return Err(ValidationError::MalformedRecipient);
                }
            }
        }

        Ok(())
    }
}

impl Serializer for Transaction {
    fn write(&self, writer: &mut Writer) {
        self.data.write(writer);
        self.signature.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let data = TransactionType::read(reader)?;
        let signature = Signature::read(reader)?;
        Ok(Self { data, signature })
    }

    fn size(&self) -> usize {
        self.data.size() + self.signature.size()
    }
}

impl Hashable for Transaction {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn recipient() -> Address {
        Address::from_public_key(&KeyPair::new().get_public_key())
    }

    #[test]
    fn test_payment_signature() {
        let keypair = KeyPair::new();
        let tx = Transaction::new_payment(&keypair, recipient(), 100, 10, 1_000);
        assert!(tx.verify_signature());

        // Re-signing the same payload with another key must not verify
        let forged = Transaction::new(tx.get_data().clone(), KeyPair::new().sign(&tx.get_data().to_bytes()));
        assert!(!forged.verify_signature());
    }

    #[test]
    fn test_genesis_signature_deterministic() {
        let to = recipient();
        let a = Transaction::new_genesis(to.clone(), 1000, 0);
        let b = Transaction::new_genesis(to, 1000, 0);
        assert_eq!(a.get_signature(), b.get_signature());
        assert!(a.verify_signature());
    }

    #[test]
    fn test_balance_changes() {
        let keypair = KeyPair::new();
        let to = recipient();
        let tx = Transaction::new_payment(&keypair, to.clone(), 100, 10, 1_000);

        let changes = tx.get_balance_changes();
        let sender = Address::from_public_key(&keypair.get_public_key());
        assert_eq!(changes, vec![(sender, -110), (to, 100)]);
    }

    #[test]
    fn test_validate_fields() {
        let keypair = KeyPair::new();
        let ok = Transaction::new_payment(&keypair, recipient(), 100, 10, 1_000);
        assert!(ok.validate_fields().is_ok());

        let no_amount = Transaction::new_payment(&keypair, recipient(), 0, 10, 1_000);
        assert!(matches!(no_amount.validate_fields(), Err(ValidationError::ZeroAmount)));

        let no_fee = Transaction::new_payment(&keypair, recipient(), 100, 0, 1_000);
        assert!(matches!(no_fee.validate_fields(), Err(ValidationError::ZeroFee)));
    }

    #[test]
    fn test_serializer_round_trip() {
        let keypair = KeyPair::new();
        let tx = Transaction::new_payment(&keypair, recipient(), 100, 10, 1_000);
        let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(tx, decoded);
        assert_eq!(tx.size(), tx.to_bytes().len());

        let genesis = Transaction::new_genesis(recipient(), 5_000, 0);
        let decoded = Transaction::from_bytes(&genesis.to_bytes()).unwrap();
        assert_eq!(genesis, decoded);
    }
}
