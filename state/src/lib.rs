pub mod core;

pub use crate::core::{
    error::LedgerError,
    filter,
    ledger::Ledger,
    storage::{SledStorage, Storage},
};
