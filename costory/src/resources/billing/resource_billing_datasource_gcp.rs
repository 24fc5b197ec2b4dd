//! GCP billing datasource resource implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    datasource_id, imported_state, refresh_after_create_warning, update_not_supported,
};
use crate::api::{DeleteOutcome, GcpBillingDatasource, GcpBillingDatasourceRequest};
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

pub const TYPE_NAME: &str = "costory_billing_datasource_gcp";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpBillingDatasourceModel {
    pub id: Option<String>,
    pub status: Option<String>,
    pub name: Option<String>,
    /// Sent to the API as the table path, read back as its `bq_uri`.
    pub bq_table_path: Option<String>,
    pub is_detailed_billing: Option<bool>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl GcpBillingDatasourceModel {
    fn to_request(&self) -> GcpBillingDatasourceRequest {
        GcpBillingDatasourceRequest {
            name: self.name.clone().unwrap_or_default(),
            bq_uri: self.bq_table_path.clone().unwrap_or_default(),
            is_detailed_billing: self.is_detailed_billing,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        }
    }

    fn merge(&mut self, current: &GcpBillingDatasource) {
        if !current.id.is_empty() {
            self.id = Some(current.id.clone());
        }
        self.status = current.status.clone();
        if !current.name.is_empty() {
            self.name = Some(current.name.clone());
        }
        if !current.bq_uri.is_empty() {
            self.bq_table_path = Some(current.bq_uri.clone());
        }
        if current.is_detailed_billing.is_some() {
            self.is_detailed_billing = current.is_detailed_billing;
        }
        if current.start_date.is_some() {
            self.start_date = current.start_date.clone();
        }
        if current.end_date.is_some() {
            self.end_date = current.end_date.clone();
        }
    }
}

#[derive(Default)]
pub struct GcpBillingDatasourceResource {
    provider_data: Option<CostoryProviderData>,
}

impl GcpBillingDatasourceResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Creates a Costory GCP billing datasource.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Billing datasource ID returned by Costory.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Datasource status returned by Costory.")
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
                AttributeBuilder::new("bq_table_path", AttributeType::String)
                    .description("BigQuery table path used for billing export.")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_detailed_billing", AttributeType::Bool)
                    .description("Whether Costory should use detailed billing rows.")
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
            .build()
    }

    fn store(
        model: &GcpBillingDatasourceModel,
        fallback: DynamicValue,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DynamicValue {
        match DynamicValue::from_model(model) {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to store GCP billing datasource state",
                    e.to_string(),
                ));
                fallback
            }
        }
    }
}

#[async_trait]
impl Resource for GcpBillingDatasourceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(unconfigured_client("resource"));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let mut plan: GcpBillingDatasourceModel = match request.planned_state.to_model() {
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

        if let Err(e) = client
            .validate_gcp_billing_datasource(&ctx, &create_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Unable to validate GCP billing datasource",
                e.to_string(),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let created = match client
            .create_gcp_billing_datasource(&ctx, &create_request)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to create GCP billing datasource",
                    e.to_string(),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        tracing::debug!("Created GCP billing datasource {}", created.id);
        plan.merge(&created);

        match client.get_gcp_billing_datasource(&ctx, &created.id).await {
            Ok(current) => plan.merge(&current),
            Err(e) => diagnostics.push(refresh_after_create_warning(&e)),
        }

        let new_state = Self::store(&plan, request.planned_state, &mut diagnostics);
        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(unconfigured_client("resource"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let parsed = request
            .current_state
            .to_model::<GcpBillingDatasourceModel>()
            .map_err(|e| Diagnostic::error("Invalid resource state", e.to_string()))
            .and_then(|state| Ok((datasource_id(&request.current_state)?, state)));
        let (id, mut state) = match parsed {
            Ok(parsed) => parsed,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match provider_data.client.get_gcp_billing_datasource(&ctx, &id).await {
            Ok(current) => {
                state.merge(&current);
                let new_state = Self::store(&state, request.current_state, &mut diagnostics);
                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "GCP billing datasource {} no longer exists, removing from state",
                    id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to read GCP billing datasource",
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
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![unconfigured_client("resource")],
            };
        };

        let id = match datasource_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let diagnostics = match provider_data.client.delete_billing_datasource(&ctx, &id).await {
            Ok(DeleteOutcome::Deleted) => vec![],
            Ok(DeleteOutcome::AlreadyGone) => {
                tracing::warn!("GCP billing datasource {} was already deleted", id);
                vec![]
            }
            Err(e) => vec![Diagnostic::error(
                "Unable to delete GCP billing datasource",
                e.to_string(),
            )],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for GcpBillingDatasourceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let diagnostics = match CostoryProviderData::from_any(request.provider_data, "resource") {
            Ok(provider_data) => {
                if provider_data.is_some() {
                    self.provider_data = provider_data;
                }
                vec![]
            }
            Err(diag) => vec![diag],
        };

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for GcpBillingDatasourceResource {
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
