//! HNLD balances.

mod balance_model;

pub use balance_model::*;
