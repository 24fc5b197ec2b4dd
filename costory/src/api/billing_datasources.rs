//! Billing datasource API implementation
//!
//! AWS Cost & Usage Report and GCP BigQuery billing export datasources share
//! one set of routes; the `type` field of the payload tells them apart.
//! Datasources are immutable once created: there is no update call.

use serde::Serialize;

use super::client::NO_BODY;
use super::routes::{Operation, RouteParams};
use super::{normalize, ApiError, Client};
use crate::context::Context;

pub const BILLING_DATASOURCE_TYPE_AWS: &str = "AWS";
pub const BILLING_DATASOURCE_TYPE_GCP: &str = "GCP";

/// Input used to validate or create an AWS billing datasource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AwsBillingDatasourceRequest {
    pub name: String,
    pub bucket_name: String,
    pub role_arn: String,
    pub prefix: String,
    pub eks_split_data_enabled: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub eks_split: Option<bool>,
}

/// AWS billing datasource as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AwsBillingDatasource {
    pub id: String,
    pub datasource_type: String,
    pub status: Option<String>,
    pub name: String,
    pub bucket_name: String,
    pub role_arn: String,
    pub prefix: String,
    pub eks_split_data_enabled: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub eks_split: Option<bool>,
}

/// Input used to validate or create a GCP billing datasource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GcpBillingDatasourceRequest {
    pub name: String,
    /// BigQuery billing export table, `project.dataset.table`.
    pub bq_uri: String,
    pub is_detailed_billing: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GCP billing datasource as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GcpBillingDatasource {
    pub id: String,
    pub datasource_type: String,
    pub status: Option<String>,
    pub name: String,
    pub bq_uri: String,
    pub is_detailed_billing: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Result of a delete call. Both variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The backend answered 404: nothing left to delete.
    AlreadyGone,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AwsBillingDatasourcePayload<'a> {
    #[serde(rename = "type")]
    datasource_type: &'static str,
    name: &'a str,
    bucket_name: &'a str,
    role_arn: &'a str,
    prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    eks_split_data_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eks_split: Option<bool>,
}

impl<'a> From<&'a AwsBillingDatasourceRequest> for AwsBillingDatasourcePayload<'a> {
    fn from(request: &'a AwsBillingDatasourceRequest) -> Self {
        Self {
            datasource_type: BILLING_DATASOURCE_TYPE_AWS,
            name: &request.name,
            bucket_name: &request.bucket_name,
            role_arn: &request.role_arn,
            prefix: &request.prefix,
            eks_split_data_enabled: request.eks_split_data_enabled,
            start_date: request.start_date.as_deref(),
            end_date: request.end_date.as_deref(),
            eks_split: request.eks_split,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GcpBillingDatasourcePayload<'a> {
    #[serde(rename = "type")]
    datasource_type: &'static str,
    name: &'a str,
    bq_table_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_detailed_billing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<&'a str>,
}

impl<'a> From<&'a GcpBillingDatasourceRequest> for GcpBillingDatasourcePayload<'a> {
    fn from(request: &'a GcpBillingDatasourceRequest) -> Self {
        Self {
            datasource_type: BILLING_DATASOURCE_TYPE_GCP,
            name: &request.name,
            bq_table_path: &request.bq_uri,
            is_detailed_billing: request.is_detailed_billing,
            start_date: request.start_date.as_deref(),
            end_date: request.end_date.as_deref(),
        }
    }
}

impl Client {
    /// Dry-run a GCP datasource creation. Any 2xx passes.
    pub async fn validate_gcp_billing_datasource(
        &self,
        ctx: &Context,
        request: &GcpBillingDatasourceRequest,
    ) -> Result<(), ApiError> {
        let payload = GcpBillingDatasourcePayload::from(request);
        self.validate(ctx, &payload).await
    }

    /// Dry-run an AWS datasource creation. Any 2xx passes.
    pub async fn validate_aws_billing_datasource(
        &self,
        ctx: &Context,
        request: &AwsBillingDatasourceRequest,
    ) -> Result<(), ApiError> {
        let payload = AwsBillingDatasourcePayload::from(request);
        self.validate(ctx, &payload).await
    }

    /// Create a GCP billing datasource. Not idempotent: calling twice may
    /// create two datasources.
    pub async fn create_gcp_billing_datasource(
        &self,
        ctx: &Context,
        request: &GcpBillingDatasourceRequest,
    ) -> Result<GcpBillingDatasource, ApiError> {
        let payload = GcpBillingDatasourcePayload::from(request);
        let body = self.create(ctx, &payload).await?;

        let created = normalize::gcp_billing_datasource(&body)?;
        if created.id.is_empty() {
            return Err(ApiError::MissingId);
        }

        Ok(created)
    }

    /// Create an AWS billing datasource. Not idempotent: calling twice may
    /// create two datasources.
    pub async fn create_aws_billing_datasource(
        &self,
        ctx: &Context,
        request: &AwsBillingDatasourceRequest,
    ) -> Result<AwsBillingDatasource, ApiError> {
        let payload = AwsBillingDatasourcePayload::from(request);
        let body = self.create(ctx, &payload).await?;

        let created = normalize::aws_billing_datasource(&body)?;
        if created.id.is_empty() {
            return Err(ApiError::MissingId);
        }

        Ok(created)
    }

    /// Get a GCP billing datasource by id. A 404 yields [`ApiError::NotFound`].
    pub async fn get_gcp_billing_datasource(
        &self,
        ctx: &Context,
        datasource_id: &str,
    ) -> Result<GcpBillingDatasource, ApiError> {
        let body = self.get_by_id(ctx, datasource_id).await?;

        let mut current = normalize::gcp_billing_datasource(&body)?;
        if current.id.is_empty() {
            current.id = datasource_id.to_string();
        }

        Ok(current)
    }

    /// Get an AWS billing datasource by id. A 404 yields [`ApiError::NotFound`].
    pub async fn get_aws_billing_datasource(
        &self,
        ctx: &Context,
        datasource_id: &str,
    ) -> Result<AwsBillingDatasource, ApiError> {
        let body = self.get_by_id(ctx, datasource_id).await?;

        let mut current = normalize::aws_billing_datasource(&body)?;
        if current.id.is_empty() {
            current.id = datasource_id.to_string();
        }

        Ok(current)
    }

    /// Delete a billing datasource of either kind.
    pub async fn delete_billing_datasource(
        &self,
        ctx: &Context,
        datasource_id: &str,
    ) -> Result<DeleteOutcome, ApiError> {
        let response = self
            .dispatch(
                ctx,
                Operation::DeleteBillingDatasource,
                RouteParams::id(datasource_id),
                NO_BODY,
            )
            .await?;

        match response.status {
            200 | 204 => Ok(DeleteOutcome::Deleted),
            404 => {
                tracing::debug!("Billing datasource {} already deleted", datasource_id);
                Ok(DeleteOutcome::AlreadyGone)
            }
            status => Err(ApiError::unexpected_status(status, &response.body)),
        }
    }

    async fn validate<B: Serialize>(&self, ctx: &Context, payload: &B) -> Result<(), ApiError> {
        let response = self
            .dispatch(
                ctx,
                Operation::ValidateBillingDatasource,
                RouteParams::none(),
                Some(payload),
            )
            .await?;

        if response.is_success() {
            return Ok(());
        }

        Err(ApiError::unexpected_status(response.status, &response.body))
    }

    async fn create<B: Serialize>(&self, ctx: &Context, payload: &B) -> Result<Vec<u8>, ApiError> {
        let response = self
            .dispatch(
                ctx,
                Operation::CreateBillingDatasource,
                RouteParams::none(),
                Some(payload),
            )
            .await?;

        if !response.is_success() {
            return Err(ApiError::unexpected_status(response.status, &response.body));
        }

        Ok(response.body)
    }

    async fn get_by_id(&self, ctx: &Context, datasource_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .dispatch(
                ctx,
                Operation::GetBillingDatasource,
                RouteParams::id(datasource_id),
                NO_BODY,
            )
            .await?;

        match response.status {
            200 => Ok(response.body),
            404 => Err(ApiError::NotFound),
            status => Err(ApiError::unexpected_status(status, &response.body)),
        }
    }
}
