//! Dynamics 365 Web API Module
//!
//! Authentication, a thin HTTP client, OData query building and the write
//! operations the merge workflow issues.

pub mod auth;
pub mod client;
pub mod models;
pub mod operations;
pub mod pluralization;
pub mod query;

pub use client::DynamicsClient;
pub use models::{CredentialSet, Environment};
pub use operations::Operation;
pub use query::QueryBuilder;
