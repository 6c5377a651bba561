//! Versioned Route Resolution
//!
//! Maps a resource area (a versioned logical API group identified by a
//! stable GUID) to a concrete request URL and a negotiated api version.
//! The client depends only on the [`RouteResolver`] capability;
//! [`ResourceAreaResolver`] is the HTTP-backed implementation that fetches
//! area metadata from the service at call time.

use crate::error::ProvenanceError;
use crate::transport::{
    build_http_client, RequestHandler, HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// A REST api version, e.g. `5.0`, `5.0-preview`, or `5.0-preview.1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
    preview: bool,
    revision: Option<u32>,
}

impl ApiVersion {
    /// A released version, `major.minor`
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            preview: false,
            revision: None,
        }
    }

    /// A preview version with a revision, `major.minor-preview.revision`
    pub const fn preview(major: u32, minor: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            preview: true,
            revision: Some(revision),
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// The released `(major, minor)` pair, the part version negotiation
    /// compares on.
    pub fn release_pair(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    pub fn parse(input: &str) -> Result<Self, ProvenanceError> {
        let invalid =
            || ProvenanceError::RouteResolution(format!("Invalid api-version '{}'", input));

        let (number, preview_part) = match input.split_once('-') {
            Some((number, rest)) => (number, Some(rest)),
            None => (input, None),
        };

        let (major, minor) = number.split_once('.').ok_or_else(invalid)?;
        let major: u32 = major.parse().map_err(|_| invalid())?;
        let minor: u32 = minor.parse().map_err(|_| invalid())?;

        match preview_part {
            None => Ok(Self::new(major, minor)),
            Some("preview") => Ok(Self {
                major,
                minor,
                preview: true,
                revision: None,
            }),
            Some(rest) => {
                let revision = rest.strip_prefix("preview.").ok_or_else(invalid)?;
                let revision: u32 = revision.parse().map_err(|_| invalid())?;
                Ok(Self::preview(major, minor, revision))
            }
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.preview {
            write!(f, "-preview")?;
            if let Some(revision) = self.revision {
                write!(f, ".{}", revision)?;
            }
        }
        Ok(())
    }
}

/// A resolved request target: the fully qualified URL plus the api version
/// negotiated for the call
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub request_url: String,
    pub api_version: ApiVersion,
}

/// Capability for resolving a resource area to a concrete route
#[async_trait]
pub trait RouteResolver: Send + Sync {
    async fn resolve(
        &self,
        min_version: &ApiVersion,
        area_name: &str,
        area_id: &str,
        route_values: &BTreeMap<String, String>,
    ) -> Result<ResolvedRoute, ProvenanceError>;
}

/// Substitute `{placeholder}` segments of a route template from the given
/// route values. An unbound placeholder is a resolution error.
pub fn expand_route_template(
    template: &str,
    route_values: &BTreeMap<String, String>,
) -> Result<String, ProvenanceError> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ProvenanceError::RouteResolution(format!(
                "Unterminated placeholder in route template '{}'",
                template
            ))
        })?;
        let key = &after[..end];
        let value = route_values.get(key).ok_or_else(|| {
            ProvenanceError::RouteResolution(format!("No value for route parameter '{}'", key))
        })?;
        expanded.push_str(value);
        rest = &after[end + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

/// Resource area metadata as served by the service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceArea {
    #[allow(dead_code)]
    id: String,
    name: String,
    location_url: String,
    #[serde(default)]
    max_version: Option<String>,
}

fn negotiate_version(
    requested: &ApiVersion,
    max_supported: Option<&str>,
) -> Result<ApiVersion, ProvenanceError> {
    if let Some(max) = max_supported {
        let max = ApiVersion::parse(max)?;
        if max.release_pair() < requested.release_pair() {
            return Err(ProvenanceError::RouteResolution(format!(
                "Service supports api-version {} at most, {} requested",
                max, requested
            )));
        }
    }
    Ok(requested.clone())
}

/// HTTP-backed resolver: fetches resource area metadata per call and
/// expands a registered route template for the area.
pub struct ResourceAreaResolver {
    client: Client,
    base_url: String,
    handlers: Vec<RequestHandler>,
    routes: HashMap<String, String>,
}

impl ResourceAreaResolver {
    pub fn new(
        base_url: impl Into<String>,
        handlers: Vec<RequestHandler>,
    ) -> Result<Self, ProvenanceError> {
        let client = build_http_client(HTTP_CONNECT_TIMEOUT, HTTP_REQUEST_TIMEOUT)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            handlers,
            routes: HashMap::new(),
        })
    }

    /// Register the route template for a resource area, e.g.
    /// `_apis/provenance/session/{protocol}`.
    pub fn with_route(mut self, area_name: impl Into<String>, template: impl Into<String>) -> Self {
        self.routes.insert(area_name.into(), template.into());
        self
    }
}

#[async_trait]
impl RouteResolver for ResourceAreaResolver {
    async fn resolve(
        &self,
        min_version: &ApiVersion,
        area_name: &str,
        area_id: &str,
        route_values: &BTreeMap<String, String>,
    ) -> Result<ResolvedRoute, ProvenanceError> {
        let template = self.routes.get(area_name).ok_or_else(|| {
            ProvenanceError::RouteResolution(format!(
                "No route registered for resource area '{}'",
                area_name
            ))
        })?;

        let metadata_url = format!("{}/_apis/resourceAreas/{}", self.base_url, area_id);
        debug!(url = %metadata_url, area = area_name, "fetching resource area metadata");

        let mut request = self.client.get(&metadata_url);
        for handler in &self.handlers {
            request = handler.apply(request);
        }

        let response = request.send().await.map_err(|e| {
            ProvenanceError::RouteResolution(format!(
                "Failed to fetch resource area metadata: {}",
                e
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProvenanceError::RouteResolution(format!(
                "Resource area lookup failed with status {}: {}",
                status, error_text
            )));
        }

        let area: ResourceArea = response.json().await.map_err(|e| {
            ProvenanceError::RouteResolution(format!(
                "Failed to parse resource area metadata: {}",
                e
            ))
        })?;

        let api_version = negotiate_version(min_version, area.max_version.as_deref())?;
        let path = expand_route_template(template, route_values)?;
        let request_url = format!("{}/{}", area.location_url.trim_end_matches('/'), path);
        debug!(%request_url, %api_version, area = %area.name, "resolved route");

        Ok(ResolvedRoute {
            request_url,
            api_version,
        })
    }
}
