//! Integration tests for session creation: builder output submitted through
//! the client against mock resolver/transport collaborators.

use async_trait::async_trait;
use provenance::client::ProvenanceClient;
use provenance::context::SnapshotReader;
use provenance::error::ProvenanceError;
use provenance::routing::{ApiVersion, ResolvedRoute, RouteResolver};
use provenance::session::{self, create_session_request};
use provenance::transport::{RequestOptions, RestResponse, RestTransport};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Resolver that answers with a fixed host, like a service whose resource
/// area metadata is already known.
struct StaticResolver;

#[async_trait]
impl RouteResolver for StaticResolver {
    async fn resolve(
        &self,
        min_version: &ApiVersion,
        _area_name: &str,
        _area_id: &str,
        route_values: &BTreeMap<String, String>,
    ) -> Result<ResolvedRoute, ProvenanceError> {
        let protocol = route_values.get("protocol").cloned().unwrap_or_default();
        Ok(ResolvedRoute {
            request_url: format!(
                "https://feeds.example.test/_apis/provenance/session/{}",
                protocol
            ),
            api_version: min_version.clone(),
        })
    }
}

struct FailingResolver;

#[async_trait]
impl RouteResolver for FailingResolver {
    async fn resolve(
        &self,
        _min_version: &ApiVersion,
        area_name: &str,
        _area_id: &str,
        _route_values: &BTreeMap<String, String>,
    ) -> Result<ResolvedRoute, ProvenanceError> {
        Err(ProvenanceError::RouteResolution(format!(
            "Resource area lookup failed for '{}'",
            area_name
        )))
    }
}

enum Reply {
    Echo(serde_json::Value),
    Status(u16, &'static str),
    ConnectionError,
    NoBody,
}

struct RecordedCall {
    url: String,
    body: serde_json::Value,
    accept: String,
}

struct MockTransport {
    reply: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

#[async_trait]
impl RestTransport for MockTransport {
    async fn create(
        &self,
        url: &str,
        body: &serde_json::Value,
        options: &RequestOptions,
    ) -> Result<RestResponse, ProvenanceError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: body.clone(),
            accept: options.accept_header(),
        });
        match &self.reply {
            Reply::Echo(value) => Ok(RestResponse {
                status: 200,
                body: Some(value.clone()),
            }),
            Reply::Status(status, text) => Err(ProvenanceError::RequestFailed(format!(
                "Request failed with status {}: {}",
                status, text
            ))),
            Reply::ConnectionError => Err(ProvenanceError::RequestFailed(
                "Connection error: connection refused".to_string(),
            )),
            Reply::NoBody => Ok(RestResponse {
                status: 200,
                body: None,
            }),
        }
    }
}

fn build_snapshot() -> SnapshotReader {
    SnapshotReader::new()
        .set(session::COLLECTION_ID, "c1")
        .set(session::TEAM_PROJECT_ID, "p1")
        .set(session::BUILD_ID, "17")
        .set(session::BUILD_NUMBER, "20240101.1")
        .set(session::BUILD_DEFINITION_NAME, "ci")
        .set(session::BUILD_REPOSITORY_NAME, "widgets")
        .set(session::BUILD_REPOSITORY_PROVIDER, "Git")
        .set(session::BUILD_REPOSITORY_ID, "repo-1")
        .set(session::BUILD_SOURCE_BRANCH, "refs/heads/main")
        .set(session::BUILD_SOURCE_BRANCH_NAME, "main")
        .set(session::BUILD_SOURCE_VERSION, "abcdef0")
}

#[tokio::test]
async fn test_session_round_trip() -> anyhow::Result<()> {
    let request = create_session_request(&build_snapshot(), "myFeed")?;
    let transport = MockTransport::new(Reply::Echo(json!({ "sessionId": "abc-123" })));
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport.clone());

    let response = client.create_session(&request, "NuGet").await?;
    assert_eq!(response.session_id, "abc-123");

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(
        call.url,
        "https://feeds.example.test/_apis/provenance/session/NuGet"
    );
    assert_eq!(call.accept, "application/json;api-version=5.0-preview.1");
    assert_eq!(call.body["feed"], "myFeed");
    assert_eq!(call.body["source"], "InternalBuild");
    assert_eq!(call.body["data"][session::BUILD_ID], "17");
    Ok(())
}

#[tokio::test]
async fn test_absent_context_values_submitted_as_null() -> anyhow::Result<()> {
    let reader = SnapshotReader::new().set(session::RELEASE_ID, "42");
    let request = create_session_request(&reader, "myFeed")?;

    let transport = MockTransport::new(Reply::Echo(json!({ "sessionId": "s-1" })));
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport.clone());
    client.create_session(&request, "npm").await?;

    let calls = transport.calls();
    let data = &calls[0].body["data"];
    assert_eq!(data[session::RELEASE_ID], "42");
    assert_eq!(data[session::RELEASE_NAME], serde_json::Value::Null);
    assert_eq!(data[session::COLLECTION_ID], serde_json::Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_propagates() {
    let request = create_session_request(&build_snapshot(), "myFeed").unwrap();
    let transport = MockTransport::new(Reply::Status(503, "service unavailable"));
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport);

    let err = client.create_session(&request, "NuGet").await.unwrap_err();
    match err {
        ProvenanceError::RequestFailed(message) => {
            assert!(message.contains("503"), "lost the cause: {}", message);
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_error_propagates() {
    let request = create_session_request(&build_snapshot(), "myFeed").unwrap();
    let transport = MockTransport::new(Reply::ConnectionError);
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport);

    let err = client.create_session(&request, "NuGet").await.unwrap_err();
    assert!(matches!(err, ProvenanceError::RequestFailed(_)));
}

#[tokio::test]
async fn test_missing_body_is_malformed_response() {
    let request = create_session_request(&build_snapshot(), "myFeed").unwrap();
    let transport = MockTransport::new(Reply::NoBody);
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport);

    let err = client.create_session(&request, "NuGet").await.unwrap_err();
    assert!(matches!(err, ProvenanceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_body_without_session_id_is_malformed_response() {
    let request = create_session_request(&build_snapshot(), "myFeed").unwrap();
    let transport = MockTransport::new(Reply::Echo(json!({ "unexpected": true })));
    let client = ProvenanceClient::new(Arc::new(StaticResolver), transport);

    let err = client.create_session(&request, "NuGet").await.unwrap_err();
    assert!(matches!(err, ProvenanceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_resolution_failure_skips_the_transport() {
    let request = create_session_request(&build_snapshot(), "myFeed").unwrap();
    let transport = MockTransport::new(Reply::Echo(json!({ "sessionId": "never" })));
    let client = ProvenanceClient::new(Arc::new(FailingResolver), transport.clone());

    let err = client.create_session(&request, "NuGet").await.unwrap_err();
    assert!(matches!(err, ProvenanceError::RouteResolution(_)));
    assert!(transport.calls().is_empty());
}
