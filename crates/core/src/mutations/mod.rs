//! Mutation handlers with optimistic local updates.
//!
//! A mutation awaits the backend call first, then reflects the result in the
//! page's list. The realtime echo that follows is absorbed by the
//! reconciler's id-based dedupe.

mod mutation_runner;

pub use mutation_runner::*;
