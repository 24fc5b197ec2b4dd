pub mod billing_datasources;
pub mod client;
pub mod error;
pub mod normalize;
pub mod routes;
pub mod service_account;

#[cfg(test)]
pub mod test_helpers;

pub use billing_datasources::{
    AwsBillingDatasource, AwsBillingDatasourceRequest, DeleteOutcome, GcpBillingDatasource,
    GcpBillingDatasourceRequest,
};
pub use client::{Client, RawResponse, RetryConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use routes::Operation;
pub use service_account::ServiceAccount;
