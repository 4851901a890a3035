//! HTTP transport for REST resource APIs

use super::auth::Credentials;
use super::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::context::RequestContext;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the per-exchange request id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Parse a base URL, forcing a trailing slash so paths join underneath it
fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;

    if url.cannot_be_a_base() {
        return Err(anyhow::anyhow!("Base URL cannot carry paths: {}", base_url));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Authenticated reqwest client rooted at a base URL
#[derive(Clone)]
pub struct AuthenticatedClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl AuthenticatedClient {
    /// Create a client without a per-request timeout
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        Self::with_timeout(base_url, credentials, None)
    }

    /// Create a client; `timeout` bounds each exchange end to end
    pub fn with_timeout(
        base_url: &str,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        let mut builder = Client::builder().user_agent(format!("resource-client/{}", crate::VERSION));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn exchange(&self, label: &str, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!("{} {} ({}, request {})", request.method, request.url, label, request_id);

        let token = self.credentials.token().await?;

        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(REQUEST_ID_HEADER, request_id.as_str());

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|source| TransportError::Exchange {
            label: label.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|source| TransportError::Exchange {
            label: label.to_string(),
            source,
        })?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(TransportError::Status {
                label: label.to_string(),
                status,
                body: text,
            }
            .into());
        }

        tracing::debug!("{} -> {} ({} bytes)", request_id, status, body.len());
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl Transport for AuthenticatedClient {
    fn new_request(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiRequest> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid resource path: {}", path))?;

        // Credentials are only ever sent underneath the base URL
        if url.origin() != self.base_url.origin() || !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid resource path: {} resolves outside {}",
                path,
                self.base_url
            ));
        }

        Ok(ApiRequest { method, url, body })
    }

    async fn request_and_check_status(
        &self,
        ctx: &RequestContext,
        label: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse> {
        if let Some(done) = ctx.err() {
            return Err(TransportError::from_done(done, label).into());
        }

        tokio::select! {
            done = ctx.done() => {
                tracing::debug!("{} aborted: {:?}", label, done);
                Err(TransportError::from_done(done, label).into())
            }
            response = self.exchange(label, request) => response,
        }
    }
}

/// Format a transport error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_error(error: &anyhow::Error) -> String {
    if let Some(transport) = error.downcast_ref::<TransportError>() {
        return match transport {
            TransportError::Status { status, .. } => describe_status(*status),
            TransportError::Cancelled { .. } => "Request cancelled.".to_string(),
            TransportError::DeadlineExceeded { .. } => {
                "Request timed out. Try again or raise --timeout.".to_string()
            }
            TransportError::Exchange { .. } => {
                "Request failed. Check your network connection and try again.".to_string()
            }
        };
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

fn describe_status(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Invalid request. Check your parameters.".to_string(),
        401 => "Authentication failed. Check your token or run 'gcloud auth application-default login'.".to_string(),
        403 => "Permission denied. Check your access rights for this resource.".to_string(),
        404 => "Resource not found.".to_string(),
        409 => "Resource conflict. The resource may already exist or be in use.".to_string(),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        500..=599 => "Service temporarily unavailable. Please try again.".to_string(),
        _ => format!("Request failed with status {}.", status),
    }
}
