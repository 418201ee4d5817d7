// Names of the fixed substrate maps
pub const LAST_STATES_TREE: &str = "last_states";
pub const INCLUDED_TXS_TREE: &str = "included_txs";
pub const EXTRA_TREE: &str = "extra";

// Per-account maps are named by the address text behind this prefix
pub const ACCOUNT_TREE_PREFIX: &str = "acct:";

// Constant keys used in the extra tree
pub const STATE_HEIGHT: &[u8; 4] = b"HGHT";
pub const STORE_VERSION: &[u8; 4] = b"VRSN";
pub const COMMIT_JOURNAL: &[u8; 4] = b"JRNL";
