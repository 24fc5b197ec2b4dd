//! Resource implementations

pub mod billing;

pub use billing::{AwsBillingDatasourceResource, GcpBillingDatasourceResource};
