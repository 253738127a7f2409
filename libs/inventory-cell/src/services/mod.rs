pub mod allocation;
pub mod ledger;

pub use allocation::{allocate, plan_draws};
pub use ledger::{credit_units, InventoryService};
