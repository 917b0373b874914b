use thiserror::Error;

use super::ChangeOperation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("{operation} event on '{table}' carries no row payload")]
    MissingPayload {
        table: String,
        operation: ChangeOperation,
    },

    #[error("{operation} event on '{table}' carries no row id")]
    MissingId {
        table: String,
        operation: ChangeOperation,
    },

    #[error("Failed to decode row from '{table}': {message}")]
    Decode { table: String, message: String },

    #[error("Failed to subscribe to '{table}': {message}")]
    SubscribeFailed { table: String, message: String },

    #[error("Realtime channel closed")]
    ChannelClosed,
}
