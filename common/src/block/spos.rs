use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::GENERATION_SIGNATURE_SIZE,
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

// Serialize the generation signature as a base58 string
pub fn serialize_generation_signature<S: serde::Serializer>(
    signature: &[u8; GENERATION_SIGNATURE_SIZE],
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(&bs58::encode(signature).into_string())
}

// Deserialize the generation signature from a base58 string
pub fn deserialize_generation_signature<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<[u8; GENERATION_SIGNATURE_SIZE], D::Error> {
    let text = String::deserialize(deserializer)?;
    let decoded = bs58::decode(&text)
        .into_vec()
        .map_err(serde::de::Error::custom)?;

    // Validate length before copy_from_slice, a wrong-sized field must be
    // a decode error and not a panic
    if decoded.len() != GENERATION_SIGNATURE_SIZE {
        return Err(serde::de::Error::custom(format!(
            "Invalid generationSignature length: expected {} bytes, got {}",
            GENERATION_SIGNATURE_SIZE,
            decoded.len()
        )));
    }

    let mut signature = [0u8; GENERATION_SIGNATURE_SIZE];
    signature.copy_from_slice(&decoded);
    Ok(signature)
}

/// SPoS consensus block field.
///
/// Fixed-layout fragment of the block header carrying the stake proof of
/// the forger: mint time, mint balance and the generation signature. The
/// signature bytes are opaque here; downstream consensus logic verifies
/// them.
///
/// Binary layout: 8 bytes mint time, 8 bytes mint balance, both
/// big-endian, then the generation signature bytes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SposData {
    pub mint_time: TimestampMillis,
    pub mint_balance: u64,
    #[serde(serialize_with = "serialize_generation_signature")]
    #[serde(deserialize_with = "deserialize_generation_signature")]
    pub generation_signature: [u8; GENERATION_SIGNATURE_SIZE],
}

impl SposData {
    pub const BYTE_LENGTH: usize = 8 + 8 + GENERATION_SIGNATURE_SIZE;

    pub fn new(
        mint_time: TimestampMillis,
        mint_balance: u64,
        generation_signature: [u8; GENERATION_SIGNATURE_SIZE],
    ) -> Self {
        Self {
            mint_time,
            mint_balance,
            generation_signature,
        }
    }

    // Structured-document form, wrapped under the consensus family tag
    pub fn to_json(&self) -> Value {
        json!({ "SPOSConsensus": self })
    }

    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value["SPOSConsensus"].clone())
    }
}

impl Serializer for SposData {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.mint_time);
        writer.write_u64(&self.mint_balance);
        writer.write_bytes(&self.generation_signature);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        let mint_time = reader.read_u64()?;
        let mint_balance = reader.read_u64()?;
        let generation_signature = reader.read_bytes_32()?;

        Ok(Self {
            mint_time,
            mint_balance,
            generation_signature,
        })
    }

    fn size(&self) -> usize {
        Self::BYTE_LENGTH
    }
}
