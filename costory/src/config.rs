//! Provider configuration
//!
//! `slug`, `token` and `base_url` come from the provider block. Attributes left
//! unset there fall back to `COSTORY_SLUG`, `COSTORY_TOKEN` and
//! `COSTORY_BASE_URL`.

use serde::Deserialize;
use thiserror::Error;

use crate::api::{ApiError, Client, DEFAULT_BASE_URL};
use crate::types::{AttributePath, Diagnostic, DynamicValue, ValueError};

pub const ENV_SLUG: &str = "COSTORY_SLUG";
pub const ENV_TOKEN: &str = "COSTORY_TOKEN";
pub const ENV_BASE_URL: &str = "COSTORY_BASE_URL";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("The provider cannot create the Costory client because the slug is empty.")]
    EmptySlug,

    #[error("The provider cannot create the Costory client because the token is empty.")]
    EmptyToken,

    #[error("The provider configuration could not be decoded: {0}")]
    InvalidConfig(#[from] ValueError),

    #[error("The provider cannot create the Costory client: {0}")]
    Client(#[from] ApiError),
}

impl ProviderError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ProviderError::EmptySlug => Diagnostic::error("Invalid Costory slug", self.to_string())
                .with_attribute(AttributePath::new("slug")),
            ProviderError::EmptyToken => {
                Diagnostic::error("Invalid Costory token", self.to_string())
                    .with_attribute(AttributePath::new("token"))
            }
            ProviderError::InvalidConfig(_) => {
                Diagnostic::error("Invalid provider configuration", self.to_string())
            }
            ProviderError::Client(ApiError::InvalidUrl(_)) => {
                Diagnostic::error("Invalid Costory base URL", self.to_string())
                    .with_attribute(AttributePath::new("base_url"))
            }
            ProviderError::Client(_) => {
                Diagnostic::error("Unable to create Costory client", self.to_string())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderModel {
    slug: Option<String>,
    token: Option<String>,
    base_url: Option<String>,
}

/// Resolved and trimmed provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub slug: String,
    pub token: String,
    pub base_url: String,
}

impl ProviderConfig {
    /// Resolve settings from the provider block and the environment. Every
    /// problem is reported, not only the first one.
    pub fn resolve(config: &DynamicValue) -> Result<Self, Vec<ProviderError>> {
        let model: ProviderModel = if config.is_null() {
            ProviderModel::default()
        } else {
            config
                .to_model()
                .map_err(|e| vec![ProviderError::from(e)])?
        };

        let slug = setting(model.slug, ENV_SLUG);
        let token = setting(model.token, ENV_TOKEN);
        let base_url = setting(model.base_url, ENV_BASE_URL);

        let mut errors = Vec::new();
        if slug.is_empty() {
            errors.push(ProviderError::EmptySlug);
        }
        if token.is_empty() {
            errors.push(ProviderError::EmptyToken);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            slug,
            token,
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
        })
    }

    pub fn build_client(&self) -> Result<Client, ProviderError> {
        Ok(Client::new(&self.base_url, &self.slug, &self.token)?)
    }
}

/// Config value if set, otherwise the environment variable, trimmed.
fn setting(configured: Option<String>, env_var: &str) -> String {
    configured
        .or_else(|| std::env::var(env_var).ok())
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}
