//! Change event types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RealtimeError;

/// Operation carried by a change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

impl ChangeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOperation::Insert => "insert",
            ChangeOperation::Update => "update",
            ChangeOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded, typed change event.
///
/// Deletes only carry the id: the backend does not replay the full old row.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    Delete { id: String },
}

impl<T> ChangeEvent<T> {
    pub fn delete(id: impl Into<String>) -> Self {
        ChangeEvent::Delete { id: id.into() }
    }

    pub fn operation(&self) -> ChangeOperation {
        match self {
            ChangeEvent::Insert(_) => ChangeOperation::Insert,
            ChangeEvent::Update(_) => ChangeOperation::Update,
            ChangeEvent::Delete { .. } => ChangeOperation::Delete,
        }
    }

    /// The row carried by inserts and updates.
    pub fn row(&self) -> Option<&T> {
        match self {
            ChangeEvent::Insert(row) | ChangeEvent::Update(row) => Some(row),
            ChangeEvent::Delete { .. } => None,
        }
    }
}

/// Change event as delivered by the feed, before decoding.
///
/// Mirrors the postgres-changes payload: `new` holds the row for inserts and
/// updates, `old` holds at least the primary key for deletes. An empty object
/// counts as absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChangeEvent {
    pub table: String,
    pub event_type: ChangeOperation,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
    #[serde(default)]
    pub commit_timestamp: Option<DateTime<Utc>>,
}

impl RawChangeEvent {
    pub fn insert(table: impl Into<String>, row: Value) -> Self {
        Self::with_rows(table, ChangeOperation::Insert, Some(row), None)
    }

    pub fn update(table: impl Into<String>, row: Value) -> Self {
        Self::with_rows(table, ChangeOperation::Update, Some(row), None)
    }

    /// Update carrying the previous row image, as emitted with full replica
    /// identity.
    pub fn update_from(table: impl Into<String>, old: Value, row: Value) -> Self {
        Self::with_rows(table, ChangeOperation::Update, Some(row), Some(old))
    }

    pub fn delete(table: impl Into<String>, id: &str) -> Self {
        Self::with_rows(
            table,
            ChangeOperation::Delete,
            None,
            Some(serde_json::json!({ "id": id })),
        )
    }

    fn with_rows(
        table: impl Into<String>,
        event_type: ChangeOperation,
        new: Option<Value>,
        old: Option<Value>,
    ) -> Self {
        Self {
            table: table.into(),
            event_type,
            new,
            old,
            commit_timestamp: Some(Utc::now()),
        }
    }

    /// Row image used for column filtering: `new` for inserts and updates,
    /// `old` for deletes.
    pub fn row_image(&self) -> Option<&Value> {
        let image = match self.event_type {
            ChangeOperation::Delete => self.old.as_ref(),
            _ => self.new.as_ref(),
        };
        image.filter(|value| !is_empty_payload(value))
    }

    /// Previous row image of an update, when the backend sent one.
    pub fn old_image(&self) -> Option<&Value> {
        match self.event_type {
            ChangeOperation::Update => self.old.as_ref().filter(|value| !is_empty_payload(value)),
            _ => None,
        }
    }

    /// Decodes the raw payload into a typed event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<ChangeEvent<T>, RealtimeError> {
        match self.event_type {
            ChangeOperation::Insert | ChangeOperation::Update => {
                let payload = self.row_image().ok_or_else(|| RealtimeError::MissingPayload {
                    table: self.table.clone(),
                    operation: self.event_type,
                })?;
                let row = T::deserialize(payload).map_err(|e| RealtimeError::Decode {
                    table: self.table.clone(),
                    message: e.to_string(),
                })?;
                Ok(if self.event_type == ChangeOperation::Insert {
                    ChangeEvent::Insert(row)
                } else {
                    ChangeEvent::Update(row)
                })
            }
            ChangeOperation::Delete => {
                let id = self
                    .row_image()
                    .and_then(|old| old.get("id"))
                    .and_then(id_as_string)
                    .ok_or_else(|| RealtimeError::MissingId {
                        table: self.table.clone(),
                        operation: self.event_type,
                    })?;
                Ok(ChangeEvent::Delete { id })
            }
        }
    }
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn id_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
