use std::convert::TryInto;

use thiserror::Error;

use crate::crypto::{Hash, HASH_SIZE};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Not enough bytes left to read")]
    InvalidSize,
    #[error("Invalid value read")]
    InvalidValue,
    #[error("Invalid hex string")]
    InvalidHex,
    #[error("Invalid UTF-8 string")]
    InvalidString,
}

// Cursor over a borrowed byte slice
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, total: 0 }
    }

    fn advance(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        if n > self.bytes.len() {
            return Err(ReaderError::InvalidSize);
        }
        let (taken, rest) = self.bytes.split_at(n);
        self.bytes = rest;
        self.total += n;
        Ok(taken)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.advance(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let bytes = self.advance(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes = self.advance(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let bytes = self.advance(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().map_err(|_| ReaderError::InvalidSize)?))
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ReaderError> {
        Ok(self.advance(n)?.to_vec())
    }

    pub fn read_bytes_ref(&mut self, n: usize) -> Result<&'a [u8], ReaderError> {
        self.advance(n)
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        let bytes = self.advance(32)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidSize)
    }

    pub fn read_bytes_64(&mut self) -> Result<[u8; 64], ReaderError> {
        let bytes = self.advance(64)?;
        bytes.try_into().map_err(|_| ReaderError::InvalidSize)
    }

    pub fn read_hash(&mut self) -> Result<Hash, ReaderError> {
        let bytes: [u8; HASH_SIZE] = self.read_bytes_32()?;
        Ok(Hash::new(bytes))
    }

    // Read a length-prefixed UTF-8 string (u8 length)
    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let size = self.read_u8()? as usize;
        self.read_string_with_size(size)
    }

    pub fn read_string_with_size(&mut self, size: usize) -> Result<String, ReaderError> {
        let bytes = self.advance(size)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReaderError::InvalidString)
    }

    // Remaining bytes to read
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    // Bytes consumed so far
    pub fn total_read(&self) -> usize {
        self.total
    }
}
