//! Values and diagnostics exchanged with the plugin host
//!
//! Terraform configuration, plan and state values arrive as [`DynamicValue`]s.
//! Handlers decode them into typed models with serde; a JSON `null` becomes
//! `None`, so an unset optional attribute stays distinguishable from `false`
//! or `""`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("attribute {0} is not set")]
    Missing(AttributePath),

    #[error("attribute {path} has wrong type: expected {expected}")]
    TypeMismatch {
        path: AttributePath,
        expected: &'static str,
    },

    #[error("value is not an object")]
    NotAnObject,

    #[error("failed to convert value: {0}")]
    Serde(#[from] serde_json::Error),
}

/// An object-shaped Terraform value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicValue {
    value: Value,
}

impl DynamicValue {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self { value: Value::Null }
    }

    pub fn from_model<T: Serialize>(model: &T) -> Result<Self, ValueError> {
        Ok(Self {
            value: serde_json::to_value(model)?,
        })
    }

    pub fn to_model<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        Ok(serde_json::from_value(self.value.clone())?)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn as_json(&self) -> &Value {
        &self.value
    }

    fn lookup(&self, path: &AttributePath) -> Option<&Value> {
        let mut current = &self.value;
        for step in &path.steps {
            current = current.as_object()?.get(step)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String, ValueError> {
        match self.lookup(path) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ValueError::TypeMismatch {
                path: path.clone(),
                expected: "string",
            }),
            None => Err(ValueError::Missing(path.clone())),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool, ValueError> {
        match self.lookup(path) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(ValueError::TypeMismatch {
                path: path.clone(),
                expected: "bool",
            }),
            None => Err(ValueError::Missing(path.clone())),
        }
    }

    /// Sets a top-level attribute, turning a null value into an empty object
    /// first.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ValueError> {
        if self.value.is_null() {
            self.value = Value::Object(Map::new());
        }
        match self.value.as_object_mut() {
            Some(object) => {
                object.insert(name.to_string(), value.into());
                Ok(())
            }
            None => Err(ValueError::NotAnObject),
        }
    }
}

/// Path to an attribute inside a value, used to scope diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    pub steps: Vec<String>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![name.to_string()],
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.steps.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A user-facing message returned to Terraform.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
