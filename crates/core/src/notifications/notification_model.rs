//! Notification payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity shown on the toast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What a notification is about.
///
/// Typed so listeners can act on it (e.g. drop a deleted market from a list
/// whose realtime delete never arrived) instead of parsing messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum NotificationTopic {
    /// Free-form alert with no attached entity.
    General,

    /// A prediction market was deleted.
    MarketDeleted { market_id: String },

    /// A prediction market was resolved.
    MarketResolved {
        market_id: String,
        winning_outcome_id: String,
    },

    /// A purchase or sale request changed status.
    RequestStatusChanged { request_id: String, status: String },

    /// A purchase or sale request was removed.
    RequestRemoved { request_id: String },

    /// A chat message arrived.
    ChatMessage {
        conversation_id: String,
        sender_id: String,
    },

    /// A backend mutation failed.
    MutationFailed { action: String },

    /// Client-side validation rejected an input.
    ValidationFailed { action: String },

    /// The exchange-rate upstream failed and a cached quote was served.
    ExchangeRateStale { currency: String },
}

impl NotificationTopic {
    /// Stable event name used by streaming adapters.
    pub fn name(&self) -> &'static str {
        match self {
            NotificationTopic::General => "notification:general",
            NotificationTopic::MarketDeleted { .. } => "market:deleted",
            NotificationTopic::MarketResolved { .. } => "market:resolved",
            NotificationTopic::RequestStatusChanged { .. } => "request:status-changed",
            NotificationTopic::RequestRemoved { .. } => "request:removed",
            NotificationTopic::ChatMessage { .. } => "chat:message",
            NotificationTopic::MutationFailed { .. } => "mutation:failed",
            NotificationTopic::ValidationFailed { .. } => "validation:failed",
            NotificationTopic::ExchangeRateStale { .. } => "fx:stale",
        }
    }

    /// Id of the row a topic says is gone, if any.
    pub fn removed_market_id(&self) -> Option<&str> {
        match self {
            NotificationTopic::MarketDeleted { market_id } => Some(market_id.as_str()),
            _ => None,
        }
    }

    pub fn removed_request_id(&self) -> Option<&str> {
        match self {
            NotificationTopic::RequestRemoved { request_id } => Some(request_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    #[serde(flatten)]
    pub topic: NotificationTopic,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            title: title.into(),
            message: message.into(),
            topic: NotificationTopic::General,
            created_at: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }

    pub fn with_topic(mut self, topic: NotificationTopic) -> Self {
        self.topic = topic;
        self
    }

    /// Generic failure toast for a backend call. Details stay in the logs.
    pub fn mutation_failed(action: &str) -> Self {
        Self::error(
            "Something went wrong",
            format!("Could not {}. Please try again.", action),
        )
        .with_topic(NotificationTopic::MutationFailed {
            action: action.to_string(),
        })
    }

    pub fn market_deleted(market_id: impl Into<String>) -> Self {
        Self::info("Market removed", "This market is no longer available.").with_topic(
            NotificationTopic::MarketDeleted {
                market_id: market_id.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serialization_flattens_topic() {
        let notification = Notification::market_deleted("m1");
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["topic"], "market_deleted");
        assert_eq!(json["market_id"], "m1");
        assert_eq!(json["level"], "info");

        let back: Notification = serde_json::from_value(json).unwrap();
        assert_eq!(back, notification);
    }

    #[test]
    fn test_topic_names_are_stable() {
        assert_eq!(NotificationTopic::General.name(), "notification:general");
        assert_eq!(
            NotificationTopic::ExchangeRateStale {
                currency: "USD".into()
            }
            .name(),
            "fx:stale"
        );
    }

    #[test]
    fn test_mutation_failed_message_is_generic() {
        let notification = Notification::mutation_failed("cancel the request");
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(
            notification.message,
            "Could not cancel the request. Please try again."
        );
    }
}
