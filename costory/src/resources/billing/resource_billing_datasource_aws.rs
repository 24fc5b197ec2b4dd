//! AWS billing datasource resource implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    datasource_id, imported_state, refresh_after_create_warning, update_not_supported,
};
use crate::api::{AwsBillingDatasource, AwsBillingDatasourceRequest, DeleteOutcome};
use crate::context::Context;
use crate::provider_data::{unconfigured_client, CostoryProviderData};
use crate::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse,
};
use crate::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use crate::types::{Diagnostic, DynamicValue};

pub const TYPE_NAME: &str = "costory_billing_datasource_aws";

/// Terraform state of an AWS billing datasource. Every attribute is optional
/// here because imported state only carries the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsBillingDatasourceModel {
    pub id: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    pub bucket_name: Option<String>,
    pub role_arn: Option<String>,
    pub prefix: Option<String>,
    pub eks_split_data_enabled: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub eks_split: Option<bool>,
}

impl AwsBillingDatasourceModel {
    fn to_request(&self) -> AwsBillingDatasourceRequest {
        AwsBillingDatasourceRequest {
            name: self.name.clone().unwrap_or_default(),
            bucket_name: self.bucket_name.clone().unwrap_or_default(),
            role_arn: self.role_arn.clone().unwrap_or_default(),
            prefix: self.prefix.clone().unwrap_or_default(),
            eks_split_data_enabled: self.eks_split_data_enabled,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            eks_split: self.eks_split,
        }
    }

    /// Overwrite fields the API populated. Status always follows the API.
    fn merge(&mut self, current: &AwsBillingDatasource) {
        if !current.id.is_empty() {
            self.id = Some(current.id.clone());
        }
        self.status = current.status.clone();
        if !current.name.is_empty() {
            self.name = Some(current.name.clone());
        }
        if !current.bucket_name.is_empty() {
            self.bucket_name = Some(current.bucket_name.clone());
        }
        if !current.role_arn.is_empty() {
            self.role_arn = Some(current.role_arn.clone());
        }
        if !current.prefix.is_empty() {
            self.prefix = Some(current.prefix.clone());
        }
        if current.eks_split_data_enabled.is_some() {
            self.eks_split_data_enabled = current.eks_split_data_enabled;
        }
        if current.start_date.is_some() {
            self.start_date = current.start_date.clone();
        }
        if current.end_date.is_some() {
            self.end_date = current.end_date.clone();
        }
        if current.eks_split.is_some() {
            self.eks_split = current.eks_split;
        }
    }
}

#[derive(Default)]
pub struct AwsBillingDatasourceResource {
    provider_data: Option<CostoryProviderData>,
}

impl AwsBillingDatasourceResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Creates a Costory AWS billing datasource.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Billing datasource ID returned by Costory.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description(
                        "Datasource status returned by Costory (for example ACTIVE or PENDING).",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Billing datasource display name.")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bucket_name", AttributeType::String)
                    .description("S3 bucket containing AWS billing exports.")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_arn", AttributeType::String)
                    .description("IAM role ARN used by Costory to access AWS billing exports.")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("prefix", AttributeType::String)
                    .description("Object prefix path inside the billing export bucket.")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("eks_split_data_enabled", AttributeType::Bool)
                    .description("Whether EKS split data is enabled in ingestion.")
                    .optional()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("start_date", AttributeType::String)
                    .description("Optional filter start date (YYYY-MM-DD).")
                    .optional()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("end_date", AttributeType::String)
                    .description("Optional filter end date (YYYY-MM-DD).")
                    .optional()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("eks_split", AttributeType::Bool)
                    .description("Optional EKS split mode flag used by the API.")
                    .optional()
                    .requires_replace()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Resource for AwsBillingDatasourceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(unconfigured_client("resource"));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut plan: AwsBillingDatasourceModel = match request.planned_state.to_model() {
            Ok(plan) => plan,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Invalid planned state", e.to_string()));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };
        let create_request = plan.to_request();
        let client = &provider_data.client;

        let created = match client
            .create_aws_billing_datasource(&ctx, &create_request)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to create AWS billing datasource",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        tracing::debug!("Created AWS billing datasource {}", created.id);
        plan.merge(&created);

        match client.get_aws_billing_datasource(&ctx, &created.id).await {
            Ok(current) => plan.merge(&current),
            Err(e) => diagnostics.push(refresh_after_create_warning(&e)),
        }

        match DynamicValue::from_model(&plan) {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to store AWS billing datasource state",
                    e.to_string(),
                ));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(unconfigured_client("resource"));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let mut state: AwsBillingDatasourceModel = match request.current_state.to_model() {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Invalid resource state", e.to_string()));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };
        let id = match datasource_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match provider_data.client.get_aws_billing_datasource(&ctx, &id).await {
            Ok(current) => {
                state.merge(&current);
                if state.id.is_none() {
                    state.id = Some(current.id);
                }
                match DynamicValue::from_model(&state) {
                    Ok(new_state) => ReadResourceResponse {
                        new_state: Some(new_state),
                        diagnostics,
                    },
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Unable to store AWS billing datasource state",
                            e.to_string(),
                        ));
                        ReadResourceResponse {
                            new_state: Some(request.current_state),
                            diagnostics,
                        }
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "AWS billing datasource {} no longer exists, removing from state",
                    id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to read AWS billing datasource",
                    e.to_string(),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![update_not_supported(TYPE_NAME)],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(unconfigured_client("resource"));
                return DeleteResourceResponse { diagnostics };
            }
        };

        let id = match datasource_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data.client.delete_billing_datasource(&ctx, &id).await {
            Ok(DeleteOutcome::Deleted) => {
                tracing::debug!("Deleted AWS billing datasource {}", id);
            }
            Ok(DeleteOutcome::AlreadyGone) => {
                tracing::warn!("AWS billing datasource {} was already deleted", id);
            }
            Err(e) => diagnostics.push(Diagnostic::error(
                "Unable to delete AWS billing datasource",
                e.to_string(),
            )),
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AwsBillingDatasourceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match CostoryProviderData::from_any(request.provider_data, "resource") {
            Ok(Some(provider_data)) => self.provider_data = Some(provider_data),
            Ok(None) => {}
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for AwsBillingDatasourceResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match imported_state(request.id) {
            Ok(state) => ImportResourceStateResponse {
                state: Some(state),
                diagnostics: vec![],
            },
            Err(diag) => ImportResourceStateResponse {
                state: None,
                diagnostics: vec![diag],
            },
        }
    }
}
