use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::mutations::Validate;
use crate::realtime::{Identified, Owned};

/// Maximum characters in one message body.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_ids: [String; 2],
    #[serde(default)]
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        match &self.participant_ids {
            [a, b] if a == user_id => Some(b.as_str()),
            [a, b] if b == user_id => Some(a.as_str()),
            _ => None,
        }
    }
}

impl Identified for Conversation {
    const ENTITY: &'static str = "conversation";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Identified for ChatMessage {
    const ENTITY: &'static str = "chat_message";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Owned for ChatMessage {
    fn owner_id(&self) -> &str {
        &self.sender_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub conversation_id: String,
    pub body: String,
}

impl Validate for NewChatMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.body.trim().is_empty() {
            return Err(ValidationError::MissingField("body".to_string()));
        }
        if self.body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ValidationError::InvalidInput(format!(
                "message exceeds {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        Ok(())
    }
}

/// Ephemeral "is typing" row, one per participant and conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypingStatus {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub is_typing: bool,
    pub updated_at: DateTime<Utc>,
}

impl TypingStatus {
    pub fn key(conversation_id: &str, user_id: &str) -> String {
        format!("{}:{}", conversation_id, user_id)
    }

    pub fn new(conversation_id: &str, user_id: &str, is_typing: bool) -> Self {
        Self {
            id: Self::key(conversation_id, user_id),
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            is_typing,
            updated_at: Utc::now(),
        }
    }
}

impl Identified for TypingStatus {
    const ENTITY: &'static str = "typing_status";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Owned for TypingStatus {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        let conversation = Conversation {
            id: "c1".to_string(),
            participant_ids: ["alice".to_string(), "bob".to_string()],
            request_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(conversation.counterpart_of("alice"), Some("bob"));
        assert_eq!(conversation.counterpart_of("bob"), Some("alice"));
        assert_eq!(conversation.counterpart_of("carol"), None);
        assert!(conversation.includes("bob"));
    }

    #[test]
    fn test_message_validation() {
        let empty = NewChatMessage {
            conversation_id: "c1".to_string(),
            body: "   ".to_string(),
        };
        assert!(empty.validate().is_err());

        let long = NewChatMessage {
            conversation_id: "c1".to_string(),
            body: "x".repeat(MAX_MESSAGE_LENGTH + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_typing_key() {
        let status = TypingStatus::new("c1", "bob", true);
        assert_eq!(status.id, "c1:bob");
    }
}
