//! Generic authenticated REST resource client
//!
//! - [`resource`] - [`ResourceClient`] verbs over a templated resource path
//! - [`transport`] - the authenticated [`Transport`] seam and its reqwest implementation
//! - [`context`] - cancellation and deadlines threaded through every call
//! - [`config`] - persisted CLI configuration

pub mod config;
pub mod context;
pub mod resource;
pub mod transport;

/// Version injected at compile time via RESOURCE_CLIENT_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("RESOURCE_CLIENT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

pub use context::{CancelHandle, Done, RequestContext};
pub use resource::ResourceClient;
pub use transport::{ApiRequest, ApiResponse, Transport, TransportError};
