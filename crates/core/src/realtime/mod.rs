//! Realtime change feed and list reconciliation.
//!
//! The hosted backend pushes row-level insert/update/delete notifications.
//! This module decodes them into typed [`ChangeEvent`]s and merges them into
//! in-memory lists through [`Reconciler`].

mod change_event;
mod channel;
mod filter;
mod observer;
mod realtime_errors;
mod reconciler;

pub use change_event::{ChangeEvent, ChangeOperation, RawChangeEvent};
pub use channel::{ChannelFilter, ChannelStatus, ColumnFilter, FeedMessage, RealtimeFeed, Subscription};
pub use filter::{ListFilter, Owned, StatusBearing};
pub use observer::{LogObserver, ReconcileObserver, ReconcileRecord, RecordingObserver};
pub use realtime_errors::RealtimeError;
pub use reconciler::{ApplyOutcome, InsertPosition, Reconciler, SharedReconciler};
pub(crate) use reconciler::lock as lock_shared;

/// A backend row with a stable string id.
///
/// `ENTITY` names the row type in logs and notifications.
pub trait Identified {
    const ENTITY: &'static str;

    fn id(&self) -> &str;
}
