//! Provenance Client
//!
//! Submits a [`SessionRequest`] to the provenance service and returns the
//! assigned session identifier. One outbound request per call; every
//! failure propagates to the caller unchanged.

use crate::config::ConnectionConfig;
use crate::error::ProvenanceError;
use crate::routing::{ApiVersion, ResourceAreaResolver, RouteResolver};
use crate::session::{SessionRequest, SessionResponse};
use crate::transport::{HttpTransport, RequestOptions, RestTransport};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Resource area of the provenance service
pub const PROVENANCE_AREA_NAME: &str = "Provenance";
/// Stable GUID identifying the provenance resource area
pub const PROVENANCE_AREA_ID: &str = "503b4e54-ebf4-4d04-8eee-21c00823c2ac";
/// Route template for session creation within the area
pub const PROVENANCE_SESSION_ROUTE: &str = "_apis/provenance/session/{protocol}";

/// Minimum api version requested for session creation
pub const MIN_API_VERSION: ApiVersion = ApiVersion::preview(5, 0, 1);

/// Client for the provenance session endpoint.
///
/// Depends only on the [`RouteResolver`] and [`RestTransport`] interfaces;
/// [`ProvenanceClient::connect`] wires the HTTP-backed implementations from
/// a [`ConnectionConfig`].
pub struct ProvenanceClient {
    resolver: Arc<dyn RouteResolver>,
    transport: Arc<dyn RestTransport>,
}

impl ProvenanceClient {
    pub fn new(resolver: Arc<dyn RouteResolver>, transport: Arc<dyn RestTransport>) -> Self {
        Self {
            resolver,
            transport,
        }
    }

    /// Build a client against a live service from connection configuration.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, ProvenanceError> {
        config.validate()?;
        let handlers = config.credential.handlers();
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
        let request_timeout = Duration::from_secs(config.request_timeout_secs);

        let transport =
            HttpTransport::with_timeouts(handlers.clone(), connect_timeout, request_timeout)?;
        let resolver = ResourceAreaResolver::new(config.service_url.as_str(), handlers)?
            .with_route(PROVENANCE_AREA_NAME, PROVENANCE_SESSION_ROUTE);

        Ok(Self::new(Arc::new(resolver), Arc::new(transport)))
    }

    /// Create a session, a wrapper around a feed that stores additional
    /// metadata on the packages published to it.
    ///
    /// `protocol` is the package protocol the session targets (e.g. `NuGet`,
    /// `npm`). Single attempt: resolution, transport, and response failures
    /// all reject the call; nothing is retried or swallowed.
    pub async fn create_session(
        &self,
        session_request: &SessionRequest,
        protocol: &str,
    ) -> Result<SessionResponse, ProvenanceError> {
        let mut route_values = BTreeMap::new();
        route_values.insert("protocol".to_string(), protocol.to_string());

        let route = self
            .resolver
            .resolve(
                &MIN_API_VERSION,
                PROVENANCE_AREA_NAME,
                PROVENANCE_AREA_ID,
                &route_values,
            )
            .await?;

        let options = RequestOptions::json(route.api_version.clone());
        let body = serde_json::to_value(session_request).map_err(|e| {
            ProvenanceError::RequestFailed(format!("Failed to serialize session request: {}", e))
        })?;

        debug!(
            url = %route.request_url,
            feed = %session_request.feed,
            protocol,
            "creating provenance session"
        );
        let response = self
            .transport
            .create(&route.request_url, &body, &options)
            .await?;

        let body = response.body.ok_or_else(|| {
            ProvenanceError::MalformedResponse(format!(
                "Session creation returned status {} with no body",
                response.status
            ))
        })?;

        serde_json::from_value(body).map_err(|e| {
            ProvenanceError::MalformedResponse(format!(
                "Failed to parse session response: {}",
                e
            ))
        })
    }
}
