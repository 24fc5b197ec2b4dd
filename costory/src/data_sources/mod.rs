//! Data source implementations

pub mod service_account;

pub use service_account::ServiceAccountDataSource;
