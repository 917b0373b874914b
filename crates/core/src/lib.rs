//! HNLD Core - realtime list sync, notifications and domain records.
//!
//! This crate keeps dashboard lists in step with the hosted backend. It is
//! backend-agnostic: the backend is reached through the traits in
//! [`backend`] and the realtime feed through [`realtime::RealtimeFeed`].

pub mod backend;
pub mod balances;
pub mod chat;
pub mod constants;
pub mod errors;
pub mod fx;
pub mod markets;
pub mod mutations;
pub mod notifications;
pub mod realtime;
pub mod requests;
pub mod session;

// Re-export the pieces every page touches
pub use notifications::{Notification, NotificationCenter};
pub use realtime::{ChangeEvent, Reconciler};
pub use session::ListSession;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
