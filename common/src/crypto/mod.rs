mod address;
mod ed25519;
mod hash;

pub use address::Address;
pub use ed25519::{
    KeyPair, PublicKey, Signature, CryptoError, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
pub use hash::{hash, Hash, Hashable, HASH_SIZE};
