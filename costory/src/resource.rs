//! Resource traits and their request/response types
//!
//! The plugin host drives these traits: it creates a resource through a
//! factory, hands it provider data via [`ResourceWithConfigure::configure`],
//! then invokes one lifecycle method per Terraform operation.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait Resource: Send + Sync {
    /// MUST match the key used in the provider's resource factories.
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// MUST populate all attributes in `new_state`, including computed ones.
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// Returns `new_state: None` when the remote object no longer exists, so
    /// the host drops it from state.
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

pub struct CreateResourceRequest {
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Called right after the factory creates the resource.
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;
}

pub struct ConfigureResourceRequest {
    /// Data from `ConfigureProviderResponse::provider_data`; downcast to the
    /// provider's concrete type.
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Called during `terraform import`.
#[async_trait]
pub trait ResourceWithImportState: Resource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct ImportResourceStateRequest {
    pub id: String,
}

pub struct ImportResourceStateResponse {
    pub state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything a provider-registered resource implements.
pub trait ProviderResource: ResourceWithConfigure + ResourceWithImportState {}

impl<T: ResourceWithConfigure + ResourceWithImportState> ProviderResource for T {}

pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ProviderResource> + Send + Sync>;
