pub mod api;
pub mod config;
pub mod context;
pub mod data_source;
pub mod data_sources;
pub mod provider_data;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod types;

pub use provider_data::CostoryProviderData;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use config::ProviderConfig;
use context::Context;
use data_source::{DataSourceFactory, DataSourceWithConfigure};
use resource::{ProviderResource, ResourceFactory};
use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use types::{Diagnostic, DynamicValue};

pub const PROVIDER_TYPE_NAME: &str = "costory";

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Handed to every resource and data source `configure` call.
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

#[derive(Default)]
pub struct CostoryProvider {
    provider_data: Option<CostoryProviderData>,
}

impl CostoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    pub fn schema(&self) -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("The Costory provider forwards API calls to the Costory app.")
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("Costory tenant slug. Falls back to COSTORY_SLUG.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("Costory API token. Falls back to COSTORY_TOKEN.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("base_url", AttributeType::String)
                    .description(
                        "Costory API base URL. Defaults to `https://app.costory.io`, falls back to COSTORY_BASE_URL.",
                    )
                    .optional()
                    .build(),
            )
            .build()
    }

    pub async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let resolved = ProviderConfig::resolve(&request.config).map_err(|errors| {
            errors
                .iter()
                .map(config::ProviderError::to_diagnostic)
                .collect::<Vec<_>>()
        });
        let config = match resolved {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client = match config.build_client() {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![e.to_diagnostic()],
                    provider_data: None,
                }
            }
        };

        tracing::debug!(
            "Configured Costory client for tenant {} at {}",
            client.slug(),
            client.base_url()
        );

        let provider_data = CostoryProviderData::new(client);
        self.provider_data = Some(provider_data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(provider_data)),
        }
    }

    /// Data produced by the last successful `configure`.
    pub fn provider_data(&self) -> Option<&CostoryProviderData> {
        self.provider_data.as_ref()
    }

    pub fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::billing::resource_billing_datasource_aws::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::AwsBillingDatasourceResource::new()) as Box<dyn ProviderResource>
            }),
        );
        factories.insert(
            resources::billing::resource_billing_datasource_gcp::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::GcpBillingDatasourceResource::new()) as Box<dyn ProviderResource>
            }),
        );
        factories
    }

    pub fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            data_sources::service_account::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::ServiceAccountDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }

    pub fn resource_schemas(&self) -> HashMap<String, Schema> {
        self.resources()
            .into_iter()
            .map(|(name, factory)| (name, factory().schema()))
            .collect()
    }

    pub fn data_source_schemas(&self) -> HashMap<String, Schema> {
        self.data_sources()
            .into_iter()
            .map(|(name, factory)| (name, factory().schema()))
            .collect()
    }
}
