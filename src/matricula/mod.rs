//! Enrollment records: the row model, field normalization, per-student
//! aggregation, search filters and the REST endpoints built on them.

pub mod aggregate;
pub mod handlers;
pub mod model;
pub mod normalize;
pub mod search;
pub mod validation;
mod tests;

pub use handlers::config;
