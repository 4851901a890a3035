//! Resource Client
//!
//! Create, read, update, delete and restart verbs against a templated
//! resource path. Each call performs exactly one exchange through the
//! [`Transport`]: build the request, send it, check the status and decode
//! the body. Errors from any step are returned as-is.

use crate::context::RequestContext;
use crate::transport::{ApiResponse, Transport};
use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Status a restart answers with when there is nothing to decode
const RESTART_NO_CONTENT: StatusCode = StatusCode::OK;

/// Status PUT/DELETE answer with when there is nothing to decode
const NO_CONTENT: StatusCode = StatusCode::NO_CONTENT;

/// Client for one kind of resource rooted at `root_path`
///
/// Holds no per-call state; clones share the transport.
///
/// Errors are labelled `create {description}`, `update {description}`,
/// `restart {description}`, `read {description}`, `get resource info {path}`,
/// `modify resource {path}` or `delete resource {path}`.
#[derive(Clone)]
pub struct ResourceClient {
    transport: Arc<dyn Transport>,
    root_path: String,
    description: String,
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("root_path", &self.root_path)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    /// Create a client; `description` only appears in error messages
    pub fn new(
        transport: Arc<dyn Transport>,
        root_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            root_path: root_path.into(),
            description: description.into(),
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// POST `{root}`
    pub async fn create_resource<B, T>(&self, ctx: &RequestContext, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("create {}", self.description);
        let response = self
            .send(ctx, Method::POST, &self.root_path, encode_body(body)?, &label)
            .await?;

        response.decode()
    }

    /// POST `{root}/{path_ext}`
    pub async fn create_resource_with_path_ext<B, T>(
        &self,
        ctx: &RequestContext,
        path_ext: &str,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("create {}", self.description);
        let response = self
            .send(ctx, Method::POST, &self.path_with_ext(path_ext), encode_body(body)?, &label)
            .await?;

        response.decode()
    }

    /// PUT `{root}/{path_ext}`; `None` on 204 No Content
    pub async fn modify_resource_with_path_ext<B, T>(
        &self,
        ctx: &RequestContext,
        path_ext: &str,
        body: &B,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("update {}", self.description);
        let response = self
            .send(ctx, Method::PUT, &self.path_with_ext(path_ext), encode_body(body)?, &label)
            .await?;

        decode_unless(response, NO_CONTENT)
    }

    /// PUT `{root}/{path_ext}/restart`; `None` on 200 OK
    ///
    /// Restart endpoints answer a plain 200 when they have nothing to report,
    /// so only other 2xx statuses carry a body worth decoding.
    pub async fn restart_resource<B, T>(
        &self,
        ctx: &RequestContext,
        path_ext: &str,
        body: &B,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("restart {}", self.description);
        let path = format!("{}/restart", self.path_with_ext(path_ext));
        let response = self
            .send(ctx, Method::PUT, &path, encode_body(body)?, &label)
            .await?;

        decode_unless(response, RESTART_NO_CONTENT)
    }

    /// GET `{root}/{path_ext}`
    pub async fn fetch_resource<T>(&self, ctx: &RequestContext, path_ext: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let label = format!("read {}", self.description);
        let response = self
            .send(ctx, Method::GET, &self.path_with_ext(path_ext), None, &label)
            .await?;

        response.decode()
    }

    /// GET a caller-supplied full path
    pub async fn get_resource_info<T>(&self, ctx: &RequestContext, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let label = format!("get resource info {}", path);
        let response = self.send(ctx, Method::GET, path, None, &label).await?;

        response.decode()
    }

    /// PUT a caller-supplied full path; `None` on 204 No Content
    pub async fn modify_resource<B, T>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("modify resource {}", path);
        let response = self
            .send(ctx, Method::PUT, path, encode_body(body)?, &label)
            .await?;

        decode_unless(response, NO_CONTENT)
    }

    /// DELETE a caller-supplied full path; `None` on 204 No Content
    pub async fn delete_resource<B, T>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("delete resource {}", path);
        let response = self
            .send(ctx, Method::DELETE, path, encode_body(body)?, &label)
            .await?;

        decode_unless(response, NO_CONTENT)
    }

    fn path_with_ext(&self, path_ext: &str) -> String {
        format!("{}/{}", self.root_path, path_ext)
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        body: Option<Value>,
        label: &str,
    ) -> Result<ApiResponse> {
        let request = self.transport.new_request(method, path, body)?;
        self.transport.request_and_check_status(ctx, label, request).await
    }
}

/// Serialize a request body; JSON `null` (e.g. `&()`) means no body
fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<Option<Value>> {
    let value = serde_json::to_value(body).context("Failed to serialize request body")?;
    Ok((!value.is_null()).then_some(value))
}

fn decode_unless<T: DeserializeOwned>(response: ApiResponse, no_content: StatusCode) -> Result<Option<T>> {
    if response.status == no_content {
        return Ok(None);
    }

    response.decode().map(Some)
}
