//! Property-based tests using proptest
//!
//! These tests verify path templating, base URL confinement, no-content
//! handling and log sanitising over randomized inputs.

use anyhow::Result;
use async_trait::async_trait;
use proptest::prelude::*;
use reqwest::{Method, StatusCode};
use resource_client::transport::auth::Credentials;
use resource_client::transport::http::{sanitize_for_log, AuthenticatedClient};
use resource_client::{ApiRequest, ApiResponse, RequestContext, ResourceClient, Transport};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use url::Url;

/// Transport that records the requested paths and answers with a fixed status
struct RecordingTransport {
    status: StatusCode,
    body: Vec<u8>,
    paths: Mutex<Vec<(Method, String)>>,
}

impl RecordingTransport {
    fn new(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.as_bytes().to_vec(),
            paths: Mutex::new(Vec::new()),
        })
    }

    fn recorded(&self) -> Vec<(Method, String)> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn new_request(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiRequest> {
        self.paths.lock().unwrap().push((method.clone(), path.to_string()));
        let url = Url::parse("http://recording.invalid/")?.join(path)?;
        Ok(ApiRequest { method, url, body })
    }

    async fn request_and_check_status(
        &self,
        _ctx: &RequestContext,
        _label: &str,
        _request: ApiRequest,
    ) -> Result<ApiResponse> {
        Ok(ApiResponse::new(self.status, self.body.clone()))
    }
}

/// Resource root such as `servers` or `projects/p1/disks`
fn arb_root() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9-]{0,11}", 1..4).prop_map(|parts| parts.join("/"))
}

/// Path extension such as `42` or `web-1`
fn arb_ext() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{0,15}"
}

/// Path segments including dot segments, colons and empty segments (`//`)
fn arb_hostile_path() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        "[a-z0-9-]{1,8}",
        Just("..".to_string()),
        Just(".".to_string()),
        Just("%2e%2e".to_string()),
        Just(String::new()),
        "[a-z]{1,5}:[a-z0-9]{0,5}",
        Just("http://evil.example".to_string()),
        Just("https://api.example.com:8443".to_string()),
    ];
    prop::collection::vec(segment, 1..6).prop_map(|parts| parts.join("/"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every templated operation addresses exactly the documented path
    #[test]
    fn test_templated_paths(root in arb_root(), ext in arb_ext()) {
        let transport = RecordingTransport::new(200, r#"{"ok":true}"#);
        let client = ResourceClient::new(transport.clone(), root.clone(), "thing");
        let ctx = RequestContext::background();

        tokio_test::block_on(async {
            let _: Value = client.create_resource(&ctx, &json!({})).await.unwrap();
            let _: Value = client.create_resource_with_path_ext(&ctx, &ext, &json!({})).await.unwrap();
            let _: Option<Value> = client.modify_resource_with_path_ext(&ctx, &ext, &json!({})).await.unwrap();
            let _: Option<Value> = client.restart_resource(&ctx, &ext, &()).await.unwrap();
            let _: Value = client.fetch_resource(&ctx, &ext).await.unwrap();
        });

        let with_ext = format!("{}/{}", root, ext);
        prop_assert_eq!(
            transport.recorded(),
            vec![
                (Method::POST, root.clone()),
                (Method::POST, with_ext.clone()),
                (Method::PUT, with_ext.clone()),
                (Method::PUT, format!("{}/restart", with_ext)),
                (Method::GET, with_ext),
            ]
        );
    }

    /// Full-path operations pass the caller's path through untouched
    #[test]
    fn test_full_paths_pass_through(path in arb_root()) {
        let transport = RecordingTransport::new(204, "");
        let client = ResourceClient::new(transport.clone(), "unused", "thing");
        let ctx = RequestContext::background();

        tokio_test::block_on(async {
            let modified: Option<Value> = client.modify_resource(&ctx, &path, &json!({})).await.unwrap();
            let deleted: Option<Value> = client.delete_resource(&ctx, &path, &()).await.unwrap();
            assert!(modified.is_none());
            assert!(deleted.is_none());
        });

        prop_assert_eq!(
            transport.recorded(),
            vec![(Method::PUT, path.clone()), (Method::DELETE, path)]
        );
    }

    /// Statuses other than the no-content one always decode the body
    #[test]
    fn test_other_success_statuses_decode(status in prop_oneof![Just(200u16), Just(201), Just(202), Just(203)]) {
        let transport = RecordingTransport::new(status, r#"{"id":"42"}"#);
        let client = ResourceClient::new(transport, "servers", "server");
        let ctx = RequestContext::background();

        let updated: Option<Value> = tokio_test::block_on(
            client.modify_resource_with_path_ext(&ctx, "42", &json!({}))
        ).unwrap();

        prop_assert_eq!(updated, Some(json!({"id": "42"})));
    }

    /// Built URLs always stay under the base URL
    #[test]
    fn test_request_urls_stay_under_base(root in arb_root(), ext in arb_ext()) {
        let transport = AuthenticatedClient::new("https://api.example.com/v1", Credentials::Anonymous).unwrap();
        let path = format!("{}/{}", root, ext);

        let request = transport.new_request(Method::GET, &path, None).unwrap();

        prop_assert_eq!(
            request.url.as_str(),
            format!("https://api.example.com/v1/{}", path)
        );
    }

    /// Whatever the caller passes, a built request never leaves the base URL
    #[test]
    fn test_hostile_paths_never_leave_base(path in arb_hostile_path()) {
        let base = "https://api.example.com/api/v1/";
        let transport = AuthenticatedClient::new(base, Credentials::Anonymous).unwrap();

        if let Ok(request) = transport.new_request(Method::GET, &path, None) {
            prop_assert_eq!(request.url.host_str(), Some("api.example.com"));
            prop_assert_eq!(request.url.port_or_known_default(), Some(443));
            prop_assert!(
                request.url.as_str().starts_with(base),
                "{} escaped to {}",
                path,
                request.url
            );
        }
    }

    /// Sanitised log output is bounded and free of control characters
    #[test]
    fn test_sanitize_bounded(body in ".{0,600}") {
        let sanitized = sanitize_for_log(&body);

        prop_assert!(sanitized.chars().all(|c| c.is_ascii_graphic() || c == ' '));
        prop_assert!(sanitized.chars().count() <= 200 + 64);
    }
}
