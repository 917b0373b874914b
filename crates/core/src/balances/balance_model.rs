use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::realtime::{Identified, Owned};

/// A user's HNLD balance. Only backend transaction functions change it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HnldBalance {
    pub user_id: String,
    pub total: Decimal,
    pub available: Decimal,
    pub reserved: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl HnldBalance {
    pub fn new(user_id: impl Into<String>, total: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            total,
            available: total,
            reserved: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// `available + reserved <= total`, nothing negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total < Decimal::ZERO
            || self.available < Decimal::ZERO
            || self.reserved < Decimal::ZERO
        {
            return Err(ValidationError::InvalidInput(format!(
                "balance of '{}' has a negative component",
                self.user_id
            )));
        }
        if self.available + self.reserved > self.total {
            return Err(ValidationError::InvalidInput(format!(
                "balance of '{}' exceeds its total: {} available + {} reserved > {}",
                self.user_id, self.available, self.reserved, self.total
            )));
        }
        Ok(())
    }

    pub fn can_spend(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && amount <= self.available
    }
}

impl Identified for HnldBalance {
    const ENTITY: &'static str = "hnld_balance";

    fn id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for HnldBalance {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}
