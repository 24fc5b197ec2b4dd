//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::types::Diagnostic;
use std::any::Any;
use std::sync::Arc;

#[derive(Clone)]
pub struct CostoryProviderData {
    pub client: Arc<Client>,
}

impl CostoryProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Downcast the opaque value handed to a resource or data source
    /// `configure` call. `None` means the provider has not been configured
    /// yet, which is not an error at this point.
    pub fn from_any(
        provider_data: Option<Arc<dyn Any + Send + Sync>>,
        handler: &str,
    ) -> Result<Option<Self>, Diagnostic> {
        let Some(data) = provider_data else {
            return Ok(None);
        };

        match data.downcast_ref::<CostoryProviderData>() {
            Some(provider_data) => Ok(Some(provider_data.clone())),
            None => Err(Diagnostic::error(
                format!("Unexpected {} configure type", handler),
                "Expected CostoryProviderData. Please report this issue to the provider developers.",
            )),
        }
    }
}

/// Error reported when a handler runs before the provider configured it.
pub fn unconfigured_client(handler: &str) -> Diagnostic {
    Diagnostic::error(
        "Unconfigured Costory client",
        format!(
            "The provider did not configure the Costory API client for the {}.",
            handler
        ),
    )
}
