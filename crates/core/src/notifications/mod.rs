//! Notification center module.
//!
//! Provides typed notification payloads and a process-wide publish/subscribe
//! bus. Pages publish alerts through it and runtime adapters (toast layer,
//! SSE stream) subscribe to it, independently of any realtime channel.

mod notification_center;
mod notification_model;

pub use notification_center::*;
pub use notification_model::*;
