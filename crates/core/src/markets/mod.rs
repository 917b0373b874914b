//! Prediction markets and the bets placed on them.

mod bets_model;
mod markets_model;

pub use bets_model::*;
pub use markets_model::*;
