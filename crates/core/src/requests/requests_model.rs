use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::tables;
use crate::errors::ValidationError;
use crate::mutations::Validate;
use crate::realtime::{Identified, Owned, StatusBearing};

/// Whether the owner wants to buy or sell HNLD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Purchase,
    Sale,
}

impl RequestKind {
    pub fn table(&self) -> &'static str {
        match self {
            RequestKind::Purchase => tables::PURCHASE_REQUESTS,
            RequestKind::Sale => tables::SALE_REQUESTS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Active,
    Accepted,
    Negotiating,
    Completed,
    Cancelled,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Active => "active",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Negotiating => "negotiating",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::Expired
        )
    }

    /// Lifecycle: `active -> accepted | negotiating -> completed`, with
    /// `cancelled` and `expired` reachable from any open status. Terminal
    /// statuses never change.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Active, Accepted | Negotiating) => true,
            (Negotiating, Accepted) => true,
            (Accepted | Negotiating, Completed) => true,
            (_, Cancelled | Expired) => true,
            _ => false,
        }
    }
}

/// A purchase or sale request as stored by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub id: String,
    pub kind: RequestKind,
    pub owner_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub status: RequestStatus,
    /// Human-facing unique code, e.g. `HNLD-7Q2K9`.
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TradeRequest {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Expired
            || self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Open for a counterparty to act on.
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Active
    }
}

impl Identified for TradeRequest {
    const ENTITY: &'static str = "trade_request";

    fn id(&self) -> &str {
        &self.id
    }
}

impl StatusBearing for TradeRequest {
    type Status = RequestStatus;

    fn status(&self) -> RequestStatus {
        self.status
    }
}

impl Owned for TradeRequest {
    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Input for creating a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTradeRequest {
    pub kind: RequestKind,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Validate for NewTradeRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::MissingField("currency".to_string()));
        }
        if self.payment_method.trim().is_empty() {
            return Err(ValidationError::MissingField("payment_method".to_string()));
        }
        Ok(())
    }
}

/// Generates a request code from a random id.
pub fn make_request_code(kind: RequestKind, seed: &uuid::Uuid) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let prefix = match kind {
        RequestKind::Purchase => "PUR",
        RequestKind::Sale => "SAL",
    };
    let suffix: String = seed
        .as_bytes()
        .iter()
        .take(6)
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_terminal_statuses_are_immutable() {
        for terminal in [
            RequestStatus::Completed,
            RequestStatus::Cancelled,
            RequestStatus::Expired,
        ] {
            for next in [
                RequestStatus::Active,
                RequestStatus::Accepted,
                RequestStatus::Negotiating,
                RequestStatus::Completed,
                RequestStatus::Cancelled,
                RequestStatus::Expired,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_open_transitions() {
        assert!(RequestStatus::Active.can_transition_to(RequestStatus::Accepted));
        assert!(RequestStatus::Active.can_transition_to(RequestStatus::Negotiating));
        assert!(RequestStatus::Active.can_transition_to(RequestStatus::Cancelled));
        assert!(RequestStatus::Negotiating.can_transition_to(RequestStatus::Completed));
        assert!(!RequestStatus::Active.can_transition_to(RequestStatus::Completed));
        assert!(!RequestStatus::Accepted.can_transition_to(RequestStatus::Active));
    }

    #[test]
    fn test_validation() {
        let mut input = NewTradeRequest {
            kind: RequestKind::Sale,
            amount: dec!(500),
            currency: "HNL".to_string(),
            payment_method: "bank_transfer".to_string(),
            expires_at: None,
        };
        assert!(input.validate().is_ok());

        input.amount = Decimal::ZERO;
        assert_eq!(input.validate(), Err(ValidationError::NonPositiveAmount));

        input.amount = dec!(10);
        input.payment_method = "  ".to_string();
        assert_eq!(
            input.validate(),
            Err(ValidationError::MissingField("payment_method".to_string()))
        );
    }

    #[test]
    fn test_request_code_shape() {
        let code = make_request_code(RequestKind::Purchase, &uuid::Uuid::new_v4());
        assert!(code.starts_with("PUR-"));
        assert_eq!(code.len(), 10);
    }
}
