//! Purchase and sale requests.

mod requests_model;

pub use requests_model::*;
