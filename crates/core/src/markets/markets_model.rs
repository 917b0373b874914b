use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::mutations::Validate;
use crate::realtime::{Identified, Owned, StatusBearing};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Active,
    Closed,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Active => "active",
            MarketStatus::Closed => "closed",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        }
    }

    /// `active -> closed -> resolved`, `active | closed -> cancelled`.
    /// A cancelled market may be reopened; a resolved one never changes.
    pub fn can_transition_to(&self, next: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (self, next),
            (Active, Closed)
                | (Active, Resolved)
                | (Closed, Resolved)
                | (Active, Cancelled)
                | (Closed, Cancelled)
                | (Cancelled, Active)
        )
    }

    pub fn accepts_bets(&self) -> bool {
        *self == MarketStatus::Active
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketOutcome {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub pool: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionMarket {
    pub id: String,
    pub creator_id: String,
    pub question: String,
    pub outcomes: Vec<MarketOutcome>,
    pub status: MarketStatus,
    #[serde(default)]
    pub winning_outcome_id: Option<String>,
    #[serde(default)]
    pub total_pool: Decimal,
    pub created_at: DateTime<Utc>,
}

impl PredictionMarket {
    pub fn outcome(&self, outcome_id: &str) -> Option<&MarketOutcome> {
        self.outcomes.iter().find(|o| o.id == outcome_id)
    }

    /// Checks the resolution invariant: a resolved market has exactly one
    /// winning outcome taken from its own outcome set, any other status has
    /// none.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.status, self.winning_outcome_id.as_deref()) {
            (MarketStatus::Resolved, Some(winner)) if self.outcome(winner).is_some() => Ok(()),
            (MarketStatus::Resolved, Some(winner)) => Err(ValidationError::InvalidInput(format!(
                "winning outcome '{}' is not part of market '{}'",
                winner, self.id
            ))),
            (MarketStatus::Resolved, None) => Err(ValidationError::MissingField(
                "winning_outcome_id".to_string(),
            )),
            (_, Some(_)) => Err(ValidationError::InvalidInput(format!(
                "market '{}' has a winner but is {}",
                self.id,
                self.status.as_str()
            ))),
            (_, None) => Ok(()),
        }
    }

    pub fn recompute_total_pool(&mut self) {
        self.total_pool = self.outcomes.iter().map(|o| o.pool).sum();
    }
}

impl Identified for PredictionMarket {
    const ENTITY: &'static str = "prediction_market";

    fn id(&self) -> &str {
        &self.id
    }
}

impl StatusBearing for PredictionMarket {
    type Status = MarketStatus;

    fn status(&self) -> MarketStatus {
        self.status
    }
}

impl Owned for PredictionMarket {
    fn owner_id(&self) -> &str {
        &self.creator_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewMarket {
    pub question: String,
    pub outcome_labels: Vec<String>,
}

impl Validate for NewMarket {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::MissingField("question".to_string()));
        }
        let labels: Vec<&str> = self
            .outcome_labels
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();
        if labels.len() < 2 {
            return Err(ValidationError::InvalidInput(
                "a market needs at least two outcomes".to_string(),
            ));
        }
        let mut unique = labels.clone();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != labels.len() {
            return Err(ValidationError::InvalidInput(
                "outcome labels must be unique".to_string(),
            ));
        }
        Ok(())
    }
}
