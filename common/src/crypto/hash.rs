use std::fmt;

use crate::serializer::{Reader, ReaderError, Serializer, Writer};

pub const HASH_SIZE: usize = 32;

/// Blake3 digest of arbitrary bytes.
///
/// The engine only ever treats digests as opaque identifiers: address
/// derivation, genesis transaction identities and the balance dump
/// checksum. There is no proof-of-work interpretation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub const fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

// Digest arbitrary bytes with blake3
#[inline]
pub fn hash(input: &[u8]) -> Hash {
    Hash(blake3::hash(input).into())
}

impl Serializer for Hash {
    fn write(&self, writer: &mut Writer) {
        writer.write_hash(self);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        reader.read_hash()
    }

    fn size(&self) -> usize {
        HASH_SIZE
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

/// Digest identity for types with a canonical byte form.
pub trait Hashable: Serializer {
    fn hash(&self) -> Hash {
        hash(&self.to_bytes())
    }
}
