//! Billing datasource resources
//!
//! Both kinds are immutable: every input attribute forces replacement and
//! `update` always fails. Create sends the datasource (GCP payloads are
//! validated first), then reads it back so state holds the observed status.

pub mod resource_billing_datasource_aws;
pub mod resource_billing_datasource_gcp;

pub use resource_billing_datasource_aws::AwsBillingDatasourceResource;
pub use resource_billing_datasource_gcp::GcpBillingDatasourceResource;

use crate::api::ApiError;
use crate::types::{AttributePath, Diagnostic, DynamicValue};

pub(crate) fn update_not_supported(type_name: &str) -> Diagnostic {
    Diagnostic::error(
        "Update not supported",
        format!(
            "All attributes are immutable for {}. Terraform should replace the resource instead.",
            type_name
        ),
    )
}

/// Warning for a failed read-back right after a successful create. The
/// datasource exists either way, so create must not fail.
pub(crate) fn refresh_after_create_warning(err: &ApiError) -> Diagnostic {
    if err.is_not_found() {
        Diagnostic::warning(
            "Created datasource not yet readable",
            "Costory accepted datasource creation, but the datasource was not immediately readable. \
             The create response was stored in state and the next refresh will reconcile the observed status.",
        )
    } else {
        Diagnostic::warning("Unable to refresh datasource after create", err.to_string())
    }
}

pub(crate) fn datasource_id(state: &DynamicValue) -> Result<String, Diagnostic> {
    let path = AttributePath::new("id");
    match state.get_string(&path) {
        Ok(id) if !id.is_empty() => Ok(id),
        _ => Err(Diagnostic::error(
            "Missing billing datasource id",
            "The resource state does not contain a billing datasource id.",
        )
        .with_attribute(path)),
    }
}

/// State holding only the imported id. The next read fills in the rest.
pub(crate) fn imported_state(id: String) -> Result<DynamicValue, Diagnostic> {
    if id.trim().is_empty() {
        return Err(Diagnostic::error(
            "Invalid import id",
            "A billing datasource id is required to import the resource.",
        ));
    }

    let mut state = DynamicValue::null();
    state
        .set("id", id)
        .map_err(|e| Diagnostic::error("Invalid import id", e.to_string()))?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn refresh_warning_distinguishes_not_found() {
        let not_found = refresh_after_create_warning(&ApiError::NotFound);
        assert!(!not_found.is_error());
        assert_eq!(not_found.summary, "Created datasource not yet readable");

        let other = refresh_after_create_warning(&ApiError::UnexpectedStatus {
            status: 403,
            message: "forbidden".to_string(),
        });
        assert!(!other.is_error());
        assert_eq!(other.summary, "Unable to refresh datasource after create");
        assert_eq!(other.detail, "unexpected status code 403: forbidden");
    }

    #[test]
    fn datasource_id_rejects_missing_and_empty() {
        assert!(datasource_id(&DynamicValue::new(json!({"id": null}))).is_err());
        assert!(datasource_id(&DynamicValue::new(json!({"id": ""}))).is_err());
        assert_eq!(
            datasource_id(&DynamicValue::new(json!({"id": "ds-1"}))).unwrap(),
            "ds-1"
        );
    }

    #[test]
    fn imported_state_carries_only_the_id() {
        let state = imported_state("ds-9".to_string()).unwrap();
        assert_eq!(state.as_json(), &json!({"id": "ds-9"}));
        assert!(imported_state(" ".to_string()).is_err());
    }
}
