//! Resource access layer
//!
//! A [`ResourceClient`] addresses one collection of like resources (for
//! example `servers`) and exposes create/read/update/delete/restart verbs
//! over it. Paths are built from templates:
//!
//! - `{root}` and `{root}/{ext}` for create, update and fetch
//! - `{root}/{ext}/restart` for restart
//! - a caller-supplied full path for info, modify and delete
//!
//! # Example
//!
//! ```ignore
//! use resource_client::{RequestContext, ResourceClient};
//!
//! async fn read_server(client: &ResourceClient) -> anyhow::Result<serde_json::Value> {
//!     client.fetch_resource(&RequestContext::background(), "42").await
//! }
//! ```

mod client;

pub use client::ResourceClient;
