mod balance;
mod state;
mod transaction;

pub use balance::*;
pub use state::*;
pub use transaction::*;
