use std::{
    fmt::{Display, Error, Formatter},
    str::FromStr,
};

use serde::de::Error as SerdeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{ADDRESS_CHECKSUM_SIZE, ADDRESS_HASH_SIZE, ADDRESS_SIZE, ADDRESS_VERSION},
    crypto::{hash, PublicKey},
    serializer::{Reader, ReaderError, Serializer, Writer},
};

#[derive(Error, Debug, Clone)]
pub enum AddressError {
    #[error("Invalid base58 string")]
    InvalidBase58,

    #[error("Invalid address length: expected {}, got {}", ADDRESS_SIZE, _0)]
    InvalidLength(usize),

    #[error("Invalid address version byte: {0}")]
    InvalidVersion(u8),

    #[error("Address checksum mismatch")]
    InvalidChecksum,
}

/// Textual account identifier derived from a public key.
///
/// Layout of the decoded form: version byte, the first 20 bytes of the
/// blake3 digest of the public key, then a 4-byte checksum over the two
/// preceding parts. The base58 text is the canonical form used as storage
/// key and in every external interface.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Address(String);

impl Address {
    pub fn from_public_key(key: &PublicKey) -> Self {
        let key_hash = hash(key.as_bytes());
        let mut payload = Vec::with_capacity(ADDRESS_SIZE);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&key_hash.as_bytes()[..ADDRESS_HASH_SIZE]);

        let checksum = hash(&payload);
        payload.extend_from_slice(&checksum.as_bytes()[..ADDRESS_CHECKSUM_SIZE]);

        Address(bs58::encode(payload).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the decoded layout: length, version byte and checksum.
    pub fn is_well_formed(&self) -> bool {
        Self::check(&self.0).is_ok()
    }

    fn check(text: &str) -> Result<(), AddressError> {
        let decoded = bs58::decode(text)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        if decoded.len() != ADDRESS_SIZE {
            return Err(AddressError::InvalidLength(decoded.len()));
        }
        if decoded[0] != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion(decoded[0]));
        }

        let (payload, checksum) = decoded.split_at(ADDRESS_SIZE - ADDRESS_CHECKSUM_SIZE);
        let expected = hash(payload);
        if checksum != &expected.as_bytes()[..ADDRESS_CHECKSUM_SIZE] {
            return Err(AddressError::InvalidChecksum);
        }

        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::check(s)?;
        Ok(Address(s.to_owned()))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

impl Serializer for Address {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.0);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let text = reader.read_string()?;
        text.parse().map_err(|_| ReaderError::InvalidValue)
    }

    fn size(&self) -> usize {
        1 + self.0.len()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'a> Deserialize<'a> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(SerdeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_derived_address_is_well_formed() {
        let keypair = KeyPair::new();
        let address = Address::from_public_key(&keypair.get_public_key());
        assert!(address.is_well_formed());

        // Derivation is deterministic
        let again = Address::from_public_key(&keypair.get_public_key());
        assert_eq!(address, again);
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        let a = Address::from_public_key(&KeyPair::new().get_public_key());
        let b = Address::from_public_key(&KeyPair::new().get_public_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupted_text_rejected() {
        let address = Address::from_public_key(&KeyPair::new().get_public_key());
        let mut text = address.as_str().to_owned();
        // flip the last character to break the checksum
        let last = text.pop().unwrap();
        text.push(if last == '1' { '2' } else { '1' });

        assert!(text.parse::<Address>().is_err());
        assert!("not-base58-!!".parse::<Address>().is_err());
    }

    #[test]
    fn test_serializer_round_trip() {
        let address = Address::from_public_key(&KeyPair::new().get_public_key());
        let decoded = Address::from_bytes(&address.to_bytes()).unwrap();
        assert_eq!(address, decoded);
    }
}
