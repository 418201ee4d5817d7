mod balance;

pub use balance::{BalanceChange, VersionedBalance};
