//! Seams to the hosted backend.
//!
//! The backend owns persistence, balance accounting and realtime fan-out.
//! This module defines the calls the dashboard makes against it, plus an
//! in-memory implementation for tests and local development.

mod backend_traits;
mod memory;

pub use backend_traits::*;
pub use memory::InMemoryBackend;
