//! REST Transport
//!
//! The HTTP seam the provenance client submits requests through. The
//! [`RestTransport`] trait carries POST-semantics `create` calls; the
//! reqwest-backed [`HttpTransport`] is the production implementation, with
//! authentication applied by an opaque list of [`RequestHandler`]s supplied
//! at construction.

use crate::error::ProvenanceError;
use crate::routing::ApiVersion;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub(crate) const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Content negotiation for a single request: media type plus the
/// negotiated api version, rendered into the `Accept` header.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub accept: String,
    pub api_version: ApiVersion,
}

impl RequestOptions {
    /// Options for a JSON payload at the given api version
    pub fn json(api_version: ApiVersion) -> Self {
        Self {
            accept: "application/json".to_string(),
            api_version,
        }
    }

    /// `Accept` header value, e.g. `application/json;api-version=5.0-preview.1`
    pub fn accept_header(&self) -> String {
        format!("{};api-version={}", self.accept, self.api_version)
    }
}

/// Response from a transport call that completed with a success status
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    /// Parsed JSON body, `None` when the service returned no content
    pub body: Option<serde_json::Value>,
}

/// Asynchronous REST transport seam.
///
/// Implementations must return `Err` for connection errors, timeouts, and
/// non-success statuses; a timeout surfaces as a request failure, not a
/// distinct state.
#[async_trait]
pub trait RestTransport: Send + Sync {
    /// Issue a create (POST-semantics) call with a JSON body.
    async fn create(
        &self,
        url: &str,
        body: &serde_json::Value,
        options: &RequestOptions,
    ) -> Result<RestResponse, ProvenanceError>;
}

/// Request decorators applied to every outgoing call, in order
#[derive(Debug, Clone)]
pub enum RequestHandler {
    /// Basic auth with an empty username, the form pipeline access tokens use
    PersonalAccessToken(String),
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// An arbitrary fixed header
    Header { name: String, value: String },
}

impl RequestHandler {
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            RequestHandler::PersonalAccessToken(token) => request.basic_auth("", Some(token)),
            RequestHandler::Bearer(token) => request.bearer_auth(token),
            RequestHandler::Header { name, value } => request.header(name.as_str(), value.as_str()),
        }
    }
}

pub(crate) fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, ProvenanceError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ProvenanceError::RequestFailed(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn map_http_error(error: reqwest::Error) -> ProvenanceError {
    if error.is_timeout() {
        ProvenanceError::RequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProvenanceError::RequestFailed(format!("Connection error: {}", error))
    } else {
        ProvenanceError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    handlers: Vec<RequestHandler>,
}

impl HttpTransport {
    pub fn new(handlers: Vec<RequestHandler>) -> Result<Self, ProvenanceError> {
        Self::with_timeouts(handlers, HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        handlers: Vec<RequestHandler>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ProvenanceError> {
        let client = build_http_client(connect_timeout, request_timeout)?;
        Ok(Self { client, handlers })
    }
}

#[async_trait]
impl RestTransport for HttpTransport {
    async fn create(
        &self,
        url: &str,
        body: &serde_json::Value,
        options: &RequestOptions,
    ) -> Result<RestResponse, ProvenanceError> {
        debug!(%url, api_version = %options.api_version, "issuing create request");

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, options.accept_header());
        for handler in &self.handlers {
            request = handler.apply(request);
        }

        let response = request.json(body).send().await.map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => ProvenanceError::AuthFailed(format!(
                    "Authentication failed with status {}: {}",
                    status, error_text
                )),
                _ => ProvenanceError::RequestFailed(format!(
                    "Request failed with status {}: {}",
                    status, error_text
                )),
            });
        }

        let status_code = status.as_u16();
        let text = response.text().await.map_err(map_http_error)?;
        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).map_err(|e| {
                ProvenanceError::MalformedResponse(format!("Failed to parse response body: {}", e))
            })?)
        };

        Ok(RestResponse {
            status: status_code,
            body,
        })
    }
}
