use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::context::CancelReason;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("execute request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("marshal request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("retry canceled: {0}")]
    Cancelled(CancelReason),

    #[error("request retries exhausted after {attempts} attempts (last status {status}): {message}")]
    RetriesExhausted {
        attempts: u32,
        status: u16,
        message: String,
    },

    #[error("costory resource not found")]
    NotFound,

    #[error("unexpected status code {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("create response did not include datasource id")]
    MissingId,

    #[error("unsupported endpoint dispatch: {0}")]
    Dispatch(String),

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled(_))
    }

    /// Builds the error for a status the caller did not expect, preferring
    /// the structured `{error, reason}` body, then the raw body text, then
    /// the canonical status phrase.
    pub(crate) fn unexpected_status(status: u16, body: &[u8]) -> Self {
        ApiError::UnexpectedStatus {
            status,
            message: error_message(status, body),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) fn error_message(status: u16, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
        let error = parsed.error.as_deref().unwrap_or_default().trim();
        let reason = parsed.reason.as_deref().unwrap_or_default().trim();
        if !error.is_empty() || !reason.is_empty() {
            return format!("error={} reason={}", error, reason);
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
        .to_string()
}
