use crate::{block::Height, time::TimestampMillis};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Height of the empty chain; the first applied block lives at height 1
pub const GENESIS_HEIGHT: Height = 0;

// Hard-fork activation point for the per-sender timestamp monotonicity
// rule. Payments stamped before this instant bypass the check against the
// sender's last recorded transaction.
pub const TIMESTAMP_CHECK_EPOCH: TimestampMillis = 1_474_035_253_835;

// Size in bytes of the generation signature carried by the SPoS consensus
// block field. Fixed by the protocol.
pub const GENERATION_SIGNATURE_SIZE: usize = 32;

// Address layout: version byte + truncated key hash + checksum
pub const ADDRESS_VERSION: u8 = 0x17;
pub const ADDRESS_HASH_SIZE: usize = 20;
pub const ADDRESS_CHECKSUM_SIZE: usize = 4;
pub const ADDRESS_SIZE: usize = 1 + ADDRESS_HASH_SIZE + ADDRESS_CHECKSUM_SIZE;

// Upper bound on transactions carried by a single block
pub const MAX_BLOCK_TRANSACTIONS: usize = u16::MAX as usize;

// Cap on admission filter refinement rounds. The candidate count already
// bounds the rounds, since every round must drop at least one
// transaction; this caps the work on pathological batches.
pub const MAX_FILTER_ITERATIONS: usize = 1_000;
