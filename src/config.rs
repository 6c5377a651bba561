//! Configuration System
//!
//! Connection and logging settings for the provenance client. Settings come
//! from defaults, an optional `provenance.toml` file, and the pipeline's
//! own variables (`System.TeamFoundationCollectionUri` and
//! `System.AccessToken`), with pipeline variables applied last by the
//! caller.

use crate::context::VariableReader;
use crate::error::ProvenanceError;
use crate::logging::LoggingConfig;
use crate::transport::RequestHandler;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Pipeline variable holding the service collection URL
pub const COLLECTION_URI: &str = "System.TeamFoundationCollectionUri";
/// Pipeline variable holding the job access token
pub const ACCESS_TOKEN: &str = "System.AccessToken";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Connection to the provenance service
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credential presented to the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    #[default]
    None,
    PersonalAccessToken {
        token: String,
    },
    Bearer {
        token: String,
    },
}

impl Credential {
    /// Request handlers the transport applies for this credential
    pub fn handlers(&self) -> Vec<RequestHandler> {
        match self {
            Credential::None => Vec::new(),
            Credential::PersonalAccessToken { token } => {
                vec![RequestHandler::PersonalAccessToken(token.clone())]
            }
            Credential::Bearer { token } => vec![RequestHandler::Bearer(token.clone())],
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Credential::None => Ok(()),
            Credential::PersonalAccessToken { token } | Credential::Bearer { token } => {
                if token.is_empty() {
                    Err("Credential token cannot be empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Connection settings for the provenance service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Service base URL, e.g. the pipeline collection URL
    #[serde(default)]
    pub service_url: String,

    /// Credential presented on every request
    #[serde(default)]
    pub credential: Credential,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            credential: Credential::None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    /// Derive connection settings from the ambient pipeline variables.
    ///
    /// The collection URL is required; the access token is optional (some
    /// service endpoints accept anonymous session creation).
    pub fn from_reader(reader: &dyn VariableReader) -> Result<Self, ProvenanceError> {
        let service_url = reader.get_variable(COLLECTION_URI).ok_or_else(|| {
            ProvenanceError::ConfigError(format!("Variable {} is not set", COLLECTION_URI))
        })?;

        let credential = match reader.get_variable(ACCESS_TOKEN) {
            Some(token) if !token.is_empty() => Credential::PersonalAccessToken { token },
            _ => Credential::None,
        };

        Ok(Self {
            service_url,
            credential,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ProvenanceError> {
        if self.service_url.is_empty() {
            return Err(ProvenanceError::ConfigError(
                "Service URL cannot be empty".to_string(),
            ));
        }
        if !self.service_url.starts_with("http://") && !self.service_url.starts_with("https://") {
            return Err(ProvenanceError::ConfigError(format!(
                "Service URL must be an http(s) URL: {}",
                self.service_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ProvenanceError::ConfigError(
                "Request timeout cannot be zero".to_string(),
            ));
        }
        self.credential
            .validate()
            .map_err(ProvenanceError::ConfigError)
    }
}

/// Loads [`ProvenanceConfig`] from file sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `provenance.toml` in the working directory
    /// when present, falling back to defaults otherwise.
    pub fn load() -> Result<ProvenanceConfig, ProvenanceError> {
        let path = Path::new("provenance.toml");
        if !path.exists() {
            warn!(
                config_path = %path.display(),
                "No provenance.toml found, using default configuration"
            );
            return Ok(ProvenanceConfig::default());
        }
        Self::load_from_file(path)
    }

    /// Load configuration from an explicit file path.
    pub fn load_from_file(path: &Path) -> Result<ProvenanceConfig, ProvenanceError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .build()?;
        Ok(settings.try_deserialize::<ProvenanceConfig>()?)
    }
}
