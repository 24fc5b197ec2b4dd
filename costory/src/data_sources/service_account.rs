//! Service account data source implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse,
};
use crate::provider_data::{unconfigured_client, CostoryProviderData};
use crate::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use crate::types::{Diagnostic, DynamicValue};

pub const TYPE_NAME: &str = "costory_service_account";

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceAccountModel {
    pub service_account: String,
    pub sub_ids: Vec<String>,
}

#[derive(Default)]
pub struct ServiceAccountDataSource {
    provider_data: Option<CostoryProviderData>,
}

impl ServiceAccountDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Returns Costory service-account data from the Costory API.")
            .attribute(
                AttributeBuilder::new("service_account", AttributeType::String)
                    .description("Service account name returned by Costory.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "sub_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Subscription IDs returned by Costory.")
                .computed()
                .build(),
            )
            .build()
    }
}

#[async_trait]
impl DataSource for ServiceAccountDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn read(&self, ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(unconfigured_client("data source"));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        tracing::debug!("Reading Costory service account");

        let service_account = match provider_data.client.get_service_account(&ctx).await {
            Ok(service_account) => service_account,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to read Costory service account",
                    e.to_string(),
                ));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let model = ServiceAccountModel {
            service_account: service_account.service_account,
            sub_ids: service_account.sub_ids,
        };

        match DynamicValue::from_model(&model) {
            Ok(state) => ReadDataSourceResponse { state, diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to read Costory service account",
                    e.to_string(),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ServiceAccountDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match CostoryProviderData::from_any(request.provider_data, "data source") {
            Ok(Some(provider_data)) => self.provider_data = Some(provider_data),
            Ok(None) => {}
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
