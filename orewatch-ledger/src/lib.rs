pub mod ledger;
pub mod store;

pub use ledger::{Ledger, PlacementKey};
pub use store::DurableBackend;
