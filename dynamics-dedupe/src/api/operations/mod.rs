//! Dynamics 365 Operations Module
//!
//! Write operations executed individually through [`crate::api::DynamicsClient`].

pub mod operation;

pub use operation::{Operation, OperationResult};
