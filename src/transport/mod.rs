//! Authenticated transport
//!
//! The [`Transport`] trait is the seam between resource operations and the
//! wire: it builds requests, attaches credentials, performs exactly one
//! exchange and validates the response status.
//!
//! # Module Structure
//!
//! - [`auth`] - bearer credentials (static token or Application Default Credentials)
//! - [`http`] - reqwest-backed [`AuthenticatedClient`](http::AuthenticatedClient)
//!
//! # Example
//!
//! ```ignore
//! use resource_client::transport::{auth::Credentials, http::AuthenticatedClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let transport = AuthenticatedClient::new("https://api.example.com/v1", Credentials::Anonymous)?;
//!     let request = transport.new_request(reqwest::Method::GET, "servers/42", None)?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod http;

use crate::context::{Done, RequestContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// A request ready to be sent
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// JSON body, `None` for an empty body
    pub body: Option<Value>,
}

/// A response whose status has already been checked
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the JSON body
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).with_context(|| {
            format!(
                "Failed to parse response JSON ({} status, {} bytes)",
                self.status,
                self.body.len()
            )
        })
    }
}

/// Exchange failures raised by a transport
///
/// Every variant carries the operation label (e.g. `create server`) so the
/// message says which call failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("{label}: API request failed: {status}")]
    Status {
        label: String,
        status: StatusCode,
        body: String,
    },

    #[error("{label}: request cancelled")]
    Cancelled { label: String },

    #[error("{label}: deadline exceeded")]
    DeadlineExceeded { label: String },

    #[error("{label}: failed to send request")]
    Exchange {
        label: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    pub fn from_done(done: Done, label: &str) -> Self {
        let label = label.to_string();
        match done {
            Done::Cancelled => Self::Cancelled { label },
            Done::DeadlineExceeded => Self::DeadlineExceeded { label },
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Status { label, .. }
            | Self::Cancelled { label }
            | Self::DeadlineExceeded { label }
            | Self::Exchange { label, .. } => label,
        }
    }

    /// HTTP status for status-check failures
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authenticated request construction and exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Build a request for `path`, relative to the transport's base URL
    ///
    /// No exchange happens here; a malformed path fails now.
    fn new_request(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiRequest>;

    /// Send `request` and fail unless the response status is 2xx
    ///
    /// `label` names the operation in errors and logs. Implementations must
    /// abort the exchange and return promptly once `ctx` is done.
    async fn request_and_check_status(
        &self,
        ctx: &RequestContext,
        label: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse>;
}
