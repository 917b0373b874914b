//! Two-party chat: conversations, messages, typing indicators.

mod chat_model;

pub use chat_model::*;
