use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PredictionMarket;
use crate::constants::HNLD_DECIMAL_PRECISION;
use crate::errors::ValidationError;
use crate::mutations::Validate;
use crate::realtime::{Identified, Owned};

/// A position on one outcome. Never modified once placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub amount: Decimal,
    pub potential_payout: Decimal,
    pub placed_at: DateTime<Utc>,
}

impl Identified for Bet {
    const ENTITY: &'static str = "bet";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Owned for Bet {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewBet {
    pub market_id: String,
    pub outcome_id: String,
    pub amount: Decimal,
}

impl Validate for NewBet {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.market_id.is_empty() {
            return Err(ValidationError::MissingField("market_id".to_string()));
        }
        if self.outcome_id.is_empty() {
            return Err(ValidationError::MissingField("outcome_id".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(())
    }
}

/// Parimutuel payout for staking `amount` on `outcome_id`, assuming the
/// pools stay as they are: the stake's share of the winning pool times the
/// whole pool.
pub fn estimate_payout(
    market: &PredictionMarket,
    outcome_id: &str,
    amount: Decimal,
) -> Option<Decimal> {
    let outcome = market.outcome(outcome_id)?;
    if amount <= Decimal::ZERO {
        return None;
    }
    let winning_pool = outcome.pool + amount;
    let total_pool = market.total_pool + amount;
    Some((amount * total_pool / winning_pool).round_dp(HNLD_DECIMAL_PRECISION))
}
