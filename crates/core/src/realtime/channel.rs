//! Realtime channel subscription contract.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{RawChangeEvent, RealtimeError};

/// Equality filter on a single column, e.g. `status=eq.active`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub value: String,
}

/// What a channel listens to: one table, optionally narrowed by a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelFilter {
    pub table: String,
    pub column: Option<ColumnFilter>,
}

impl ChannelFilter {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.column = Some(ColumnFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Channel topic name, as the backend names it.
    pub fn topic(&self) -> String {
        match &self.column {
            Some(c) => format!("realtime:{}:{}=eq.{}", self.table, c.column, c.value),
            None => format!("realtime:{}", self.table),
        }
    }

    /// Whether the feed should deliver `event` on this channel.
    ///
    /// Deletes whose old image lacks the filtered column are delivered: the
    /// backend only guarantees the primary key on deletes. Updates are
    /// delivered when either image matches, so a row leaving the filter
    /// still reaches the list that holds it.
    pub fn matches(&self, event: &RawChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        let Some(filter) = &self.column else {
            return true;
        };
        let left_filter = event
            .old_image()
            .and_then(|row| row.get(&filter.column))
            .is_some_and(|value| column_value_eq(value, &filter.value));
        match event.row_image().and_then(|row| row.get(&filter.column)) {
            Some(value) => column_value_eq(value, &filter.value) || left_filter,
            None => event.event_type == super::ChangeOperation::Delete,
        }
    }
}

fn column_value_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Null => false,
        other => other.to_string() == expected,
    }
}

/// Channel lifecycle states reported by the feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelStatus {
    Subscribed,
    TimedOut,
    Closed,
    ChannelError(String),
}

impl ChannelStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ChannelStatus::Subscribed)
    }
}

/// Message delivered on a subscription.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedMessage {
    Change(RawChangeEvent),
    Status(ChannelStatus),
}

/// An open channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    filter: ChannelFilter,
    receiver: mpsc::Receiver<FeedMessage>,
}

impl Subscription {
    pub fn new(filter: ChannelFilter, receiver: mpsc::Receiver<FeedMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filter,
            receiver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }

    /// Next message, or `None` once the feed side has gone away.
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        self.receiver.recv().await
    }
}

/// Push-based source of row-level change events.
#[async_trait]
pub trait RealtimeFeed: Send + Sync {
    async fn subscribe(&self, filter: ChannelFilter) -> Result<Subscription, RealtimeError>;
}
