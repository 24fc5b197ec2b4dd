use super::client::NO_BODY;
use super::routes::{Operation, RouteParams};
use super::{normalize, ApiError, Client};
use crate::context::Context;

/// Service-account context of the configured tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceAccount {
    pub service_account: String,
    pub sub_ids: Vec<String>,
}

impl Client {
    /// Fetch the service account Costory uses for the configured tenant.
    pub async fn get_service_account(&self, ctx: &Context) -> Result<ServiceAccount, ApiError> {
        let response = self
            .dispatch(ctx, Operation::GetServiceAccount, RouteParams::none(), NO_BODY)
            .await?;

        if response.status != 200 {
            return Err(ApiError::unexpected_status(response.status, &response.body));
        }

        normalize::service_account(&response.body)
    }
}
