use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::routes::{BodyTransport, Operation, RouteParams};
use crate::context::Context;

pub const DEFAULT_BASE_URL: &str = "https://app.costory.io";
pub const SLUG_HEADER: &str = "X-Costory-Slug";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_RESPONSE_BODY_BYTES: usize = 1024 * 1024;

/// Placeholder body for operations that send nothing.
pub(crate) const NO_BODY: Option<&()> = None;

/// Costory API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    slug: String,
    auth_header: String,
    retry_config: RetryConfig,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("slug", &self.inner.slug)
            .field("retry_config", &self.inner.retry_config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait before retry `n` is `base_backoff * 2^n`, counting from zero.
    pub base_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Status and capped body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, slug: &str, token: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, slug, token, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        slug: &str,
        token: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(retry_config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                slug: slug.to_string(),
                auth_header: format!("Bearer {}", token),
                retry_config,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn slug(&self) -> &str {
        &self.inner.slug
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry_config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Resolve an endpoint contract and perform it.
    pub(crate) async fn dispatch<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        operation: Operation,
        params: RouteParams<'_>,
        body: Option<&B>,
    ) -> Result<RawResponse, ApiError> {
        let contract = operation.contract();
        let path = contract.path.resolve(params)?;

        match (contract.body, body) {
            (BodyTransport::None, _) => self.send(ctx, contract.method, &path, NO_BODY).await,
            (BodyTransport::Json, Some(body)) => {
                self.send(ctx, contract.method, &path, Some(body)).await
            }
            (BodyTransport::Json, None) => Err(ApiError::Dispatch(format!(
                "{} {} requires a JSON body",
                contract.method, path
            ))),
        }
    }

    /// Perform one logical request, retrying server errors with exponential
    /// backoff. Any non-5xx response is returned as-is for the caller to
    /// interpret.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<RawResponse, ApiError> {
        let payload = match body {
            Some(body) => Some(serde_json::to_vec(body).map_err(ApiError::Encode)?),
            None => None,
        };

        let url = self.endpoint(path);
        let retry = &self.inner.retry_config;
        let mut last = None;

        for attempt in 0..retry.max_attempts {
            if let Some(reason) = ctx.err() {
                return Err(ApiError::Cancelled(reason));
            }

            tracing::debug!("{} request to: {} (attempt {})", method, url, attempt + 1);

            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(ACCEPT, "application/json")
                .header(AUTHORIZATION, &self.inner.auth_header)
                .header(SLUG_HEADER, &self.inner.slug);
            if let Some(payload) = &payload {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(payload.clone());
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = read_capped(response).await?;

            tracing::debug!("Response status: {} ({} bytes)", status, body.len());

            if !(500..600).contains(&status) {
                return Ok(RawResponse { status, body });
            }

            last = Some(RawResponse { status, body });

            if attempt + 1 < retry.max_attempts {
                let backoff = retry.backoff(attempt);
                tracing::debug!(
                    "Retrying request to {} after {}ms (status {})",
                    path,
                    backoff.as_millis(),
                    status
                );
                tokio::select! {
                    reason = ctx.cancelled() => return Err(ApiError::Cancelled(reason)),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }

        let (status, message) = match last {
            Some(last) => (
                last.status,
                super::error::error_message(last.status, &last.body),
            ),
            None => (0, "no attempts were made".to_string()),
        };
        Err(ApiError::RetriesExhausted {
            attempts: retry.max_attempts,
            status,
            message,
        })
    }
}

/// Read at most [`MAX_RESPONSE_BODY_BYTES`] of the body; the rest is dropped.
async fn read_capped(mut response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = MAX_RESPONSE_BODY_BYTES - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_fast_client, create_test_client};
    use mockito::{Matcher, Server};
    use std::time::Instant;

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.base_backoff, Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(500));
        assert_eq!(config.backoff(1), Duration::from_millis(1000));
        assert_eq!(config.backoff(2), Duration::from_millis(2000));
        assert_eq!(config.backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        let result = Client::new("not a url", "slug", "token");
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn client_sets_auth_and_tenant_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/")
            .match_header("authorization", "Bearer test-token")
            .match_header("x-costory-slug", "test-slug")
            .match_header("accept", "application/json")
            .match_header("content-type", Matcher::Missing)
            .with_body("{}")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let response = client
            .send(&Context::new(), Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_sends_json_body_with_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/terraform/billingDatasources")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({"name": "x"})))
            .with_status(201)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let body = serde_json::json!({"name": "x"});
        let response = client
            .send(
                &Context::new(),
                Method::POST,
                "/terraform/billingDatasources",
                Some(&body),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_strips_trailing_slash_from_base_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/billingDatasources/abc")
            .create_async()
            .await;

        let client = create_test_client(&format!("{}/", server.url()));
        let _ = client
            .send(
                &Context::new(),
                Method::GET,
                "terraform/billingDatasources/abc",
                NO_BODY,
            )
            .await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_returns_final_response_after_transient_server_errors() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/terraform/")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/terraform/")
            .with_status(200)
            .with_body(r#"{"service_account":"sa"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_client(&server.url());
        let response = client
            .send(&Context::new(), Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, br#"{"service_account":"sa"}"#);
        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn client_makes_exactly_max_attempts_on_persistent_server_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/terraform/billingDatasources/x")
            .with_status(500)
            .with_body(r#"{"error":"internal","reason":"db down"}"#)
            .expect(4)
            .create_async()
            .await;

        let client = create_fast_client(&server.url());
        let err = client
            .send(
                &Context::new(),
                Method::DELETE,
                "/terraform/billingDatasources/x",
                NO_BODY,
            )
            .await
            .unwrap_err();

        match err {
            ApiError::RetriesExhausted {
                attempts,
                status,
                message,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(status, 500);
                assert_eq!(message, "error=internal reason=db down");
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_does_not_retry_client_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/")
            .with_status(400)
            .with_body("bad request")
            .expect(1)
            .create_async()
            .await;

        let client = create_fast_client(&server.url());
        let response = client
            .send(&Context::new(), Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.body, b"bad request");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_aborts_backoff_when_context_is_cancelled() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(
            &server.url(),
            "test-slug",
            "test-token",
            RetryConfig {
                base_backoff: Duration::from_secs(10),
                ..RetryConfig::default()
            },
        )
        .unwrap();

        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = client
            .send(&ctx, Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Cancelled(crate::context::CancelReason::Canceled)
        ));
        assert!(start.elapsed() < Duration::from_secs(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_aborts_backoff_when_parent_of_derived_context_is_cancelled() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = Client::with_config(
            &server.url(),
            "test-slug",
            "test-token",
            RetryConfig {
                base_backoff: Duration::from_secs(10),
                ..RetryConfig::default()
            },
        )
        .unwrap();
        assert_eq!(client.retry_config().base_backoff, Duration::from_secs(10));

        let parent = Context::new();
        let ctx = parent.clone().with_timeout(Duration::from_secs(60));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            parent.cancel();
        });

        let start = Instant::now();
        let err = client
            .send(&ctx, Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Cancelled(crate::context::CancelReason::Canceled)
        ));
        assert!(start.elapsed() < Duration::from_secs(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_reports_deadline_during_backoff() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/terraform/")
            .with_status(500)
            .create_async()
            .await;

        let client = Client::with_config(
            &server.url(),
            "test-slug",
            "test-token",
            RetryConfig {
                base_backoff: Duration::from_secs(10),
                ..RetryConfig::default()
            },
        )
        .unwrap();

        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let err = client
            .send(&ctx, Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Cancelled(crate::context::CancelReason::DeadlineExceeded)
        ));
    }

    #[tokio::test]
    async fn client_does_not_send_with_cancelled_context() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/terraform/")
            .expect(0)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let ctx = Context::new();
        ctx.cancel();

        let err = client
            .send(&ctx, Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_caps_response_body() {
        let mut server = Server::new_async().await;
        let oversized = vec![b'a'; MAX_RESPONSE_BODY_BYTES + 4096];
        let _mock = server
            .mock("GET", "/terraform/")
            .with_body(oversized)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let response = client
            .send(&Context::new(), Method::GET, "/terraform/", NO_BODY)
            .await
            .unwrap();

        assert_eq!(response.body.len(), MAX_RESPONSE_BODY_BYTES);
    }

    #[tokio::test]
    async fn client_surfaces_network_errors_without_retry() {
        let client = create_fast_client("http://127.0.0.1:1");

        let result = client
            .send(&Context::new(), Method::GET, "/terraform/", NO_BODY)
            .await;

        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn dispatch_requires_body_for_json_contracts() {
        let client = create_test_client("http://127.0.0.1:1");

        let result = client
            .dispatch(
                &Context::new(),
                Operation::CreateBillingDatasource,
                RouteParams::none(),
                NO_BODY,
            )
            .await;

        assert!(matches!(result, Err(ApiError::Dispatch(_))));
    }
}
