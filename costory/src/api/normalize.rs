//! Response normalization
//!
//! Backend revisions disagree on field casing (`bucketName` vs `bucket_name`,
//! `service_account` vs `serviceAccount`). Each response type is decoded into
//! a raw struct that keeps every observed spelling, then collapsed into its
//! canonical type by one function that takes, per field, the first populated
//! spelling in a fixed order: canonical name first, aliases after.

use serde::Deserialize;

use super::billing_datasources::{AwsBillingDatasource, GcpBillingDatasource};
use super::error::ApiError;
use super::service_account::ServiceAccount;

/// First candidate that is present and non-empty, or an empty string.
fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// First candidate that is present at all.
fn first_present<T, const N: usize>(candidates: [Option<T>; N]) -> Option<T> {
    candidates.into_iter().flatten().next()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawServiceAccount {
    service_account: Option<String>,
    #[serde(rename = "serviceAccount")]
    service_account_camel: Option<String>,
    #[serde(rename = "serviceAccountEmail")]
    service_account_email: Option<String>,
    sub_ids: Option<Vec<String>>,
    #[serde(rename = "subIds")]
    sub_ids_camel: Option<Vec<String>>,
}

pub fn service_account(body: &[u8]) -> Result<ServiceAccount, ApiError> {
    let raw: RawServiceAccount = serde_json::from_slice(body).map_err(ApiError::Decode)?;

    Ok(ServiceAccount {
        service_account: first_non_empty([
            raw.service_account,
            raw.service_account_camel,
            raw.service_account_email,
        ]),
        sub_ids: first_present([raw.sub_ids, raw.sub_ids_camel]).unwrap_or_default(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAwsBillingDatasource {
    id: Option<String>,
    #[serde(rename = "type")]
    datasource_type: Option<String>,
    status: Option<String>,
    name: Option<String>,
    #[serde(rename = "bucketName")]
    bucket_name_camel: Option<String>,
    bucket_name: Option<String>,
    #[serde(rename = "roleArn")]
    role_arn_camel: Option<String>,
    role_arn: Option<String>,
    prefix: Option<String>,
    #[serde(rename = "eksSplitDataEnabled")]
    eks_split_data_enabled_camel: Option<bool>,
    eks_split_data_enabled: Option<bool>,
    #[serde(rename = "startDate")]
    start_date_camel: Option<String>,
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date_camel: Option<String>,
    end_date: Option<String>,
    #[serde(rename = "eksSplit")]
    eks_split_camel: Option<bool>,
    eks_split: Option<bool>,
}

pub fn aws_billing_datasource(body: &[u8]) -> Result<AwsBillingDatasource, ApiError> {
    let raw: RawAwsBillingDatasource = serde_json::from_slice(body).map_err(ApiError::Decode)?;

    Ok(AwsBillingDatasource {
        id: first_non_empty([raw.id]),
        datasource_type: first_non_empty([raw.datasource_type]),
        status: raw.status,
        name: first_non_empty([raw.name]),
        bucket_name: first_non_empty([raw.bucket_name_camel, raw.bucket_name]),
        role_arn: first_non_empty([raw.role_arn_camel, raw.role_arn]),
        prefix: first_non_empty([raw.prefix]),
        eks_split_data_enabled: first_present([
            raw.eks_split_data_enabled_camel,
            raw.eks_split_data_enabled,
        ]),
        start_date: first_present([raw.start_date_camel, raw.start_date]),
        end_date: first_present([raw.end_date_camel, raw.end_date]),
        eks_split: first_present([raw.eks_split_camel, raw.eks_split]),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawGcpBillingDatasource {
    id: Option<String>,
    #[serde(rename = "type")]
    datasource_type: Option<String>,
    status: Option<String>,
    name: Option<String>,
    #[serde(rename = "bqUri")]
    bq_uri_camel: Option<String>,
    bq_uri: Option<String>,
    #[serde(rename = "bqTablePath")]
    bq_table_path_camel: Option<String>,
    bq_table_path: Option<String>,
    #[serde(rename = "isDetailedBilling")]
    is_detailed_billing_camel: Option<bool>,
    is_detailed_billing: Option<bool>,
    #[serde(rename = "startDate")]
    start_date_camel: Option<String>,
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date_camel: Option<String>,
    end_date: Option<String>,
}

pub fn gcp_billing_datasource(body: &[u8]) -> Result<GcpBillingDatasource, ApiError> {
    let raw: RawGcpBillingDatasource = serde_json::from_slice(body).map_err(ApiError::Decode)?;

    Ok(GcpBillingDatasource {
        id: first_non_empty([raw.id]),
        datasource_type: first_non_empty([raw.datasource_type]),
        status: raw.status,
        name: first_non_empty([raw.name]),
        bq_uri: first_non_empty([
            raw.bq_uri_camel,
            raw.bq_uri,
            raw.bq_table_path_camel,
            raw.bq_table_path,
        ]),
        is_detailed_billing: first_present([
            raw.is_detailed_billing_camel,
            raw.is_detailed_billing,
        ]),
        start_date: first_present([raw.start_date_camel, raw.start_date]),
        end_date: first_present([raw.end_date_camel, raw.end_date]),
    })
}
