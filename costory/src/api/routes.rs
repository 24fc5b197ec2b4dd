//! Endpoint table for the Costory Terraform API
//!
//! All paths and verbs live here so a backend route rename touches one place.

use reqwest::Method;

use super::error::ApiError;

pub const ROUTE_SERVICE_ACCOUNT: &str = "/terraform/";
pub const ROUTE_BILLING_DATASOURCES: &str = "/terraform/billingDatasources";
pub const ROUTE_BILLING_DATASOURCE_VALIDATE: &str = "/terraform/billingDatasources/validate";

/// Logical operations the client knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetServiceAccount,
    ValidateBillingDatasource,
    CreateBillingDatasource,
    GetBillingDatasource,
    DeleteBillingDatasource,
}

/// How the request payload travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTransport {
    None,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTemplate {
    Literal(&'static str),
    /// `<base>/<id>` with the id path-escaped.
    ById(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointContract {
    pub method: Method,
    pub path: PathTemplate,
    pub body: BodyTransport,
}

/// Parameters substituted into a templated path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteParams<'a> {
    pub id: Option<&'a str>,
}

impl<'a> RouteParams<'a> {
    pub fn none() -> Self {
        Self { id: None }
    }

    pub fn id(id: &'a str) -> Self {
        Self { id: Some(id) }
    }
}

impl Operation {
    pub fn contract(self) -> EndpointContract {
        match self {
            Operation::GetServiceAccount => EndpointContract {
                method: Method::GET,
                path: PathTemplate::Literal(ROUTE_SERVICE_ACCOUNT),
                body: BodyTransport::None,
            },
            Operation::ValidateBillingDatasource => EndpointContract {
                method: Method::POST,
                path: PathTemplate::Literal(ROUTE_BILLING_DATASOURCE_VALIDATE),
                body: BodyTransport::Json,
            },
            Operation::CreateBillingDatasource => EndpointContract {
                method: Method::POST,
                path: PathTemplate::Literal(ROUTE_BILLING_DATASOURCES),
                body: BodyTransport::Json,
            },
            Operation::GetBillingDatasource => EndpointContract {
                method: Method::GET,
                path: PathTemplate::ById(ROUTE_BILLING_DATASOURCES),
                body: BodyTransport::None,
            },
            Operation::DeleteBillingDatasource => EndpointContract {
                method: Method::DELETE,
                path: PathTemplate::ById(ROUTE_BILLING_DATASOURCES),
                body: BodyTransport::None,
            },
        }
    }
}

impl PathTemplate {
    pub fn resolve(self, params: RouteParams<'_>) -> Result<String, ApiError> {
        match self {
            PathTemplate::Literal(path) => Ok(path.to_string()),
            PathTemplate::ById(base) => match params.id {
                Some(id) => Ok(billing_datasource_path(base, id)),
                None => Err(ApiError::Dispatch(format!(
                    "route {}/{{id}} requires an id parameter",
                    base
                ))),
            },
        }
    }
}

fn billing_datasource_path(base: &str, id: &str) -> String {
    format!("{}/{}", base, urlencoding::encode(id))
}

/// Path of a single billing datasource.
pub fn route_billing_datasource_by_id(id: &str) -> String {
    billing_datasource_path(ROUTE_BILLING_DATASOURCES, id)
}
