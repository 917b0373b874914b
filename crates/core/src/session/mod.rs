//! Per-page list lifetime: initial fetch, realtime subscription, refresh.

mod list_loader;
mod list_session;

pub use list_loader::{FnLoader, ListLoader};
pub use list_session::ListSession;
