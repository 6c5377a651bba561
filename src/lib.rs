//! Provenance: Package Feed Publish Tracking
//!
//! Ties a package-feed publish to the CI build or release that produced the
//! packages. A session request is derived from the pipeline's ambient
//! variables and registered with the provenance service over a versioned
//! REST endpoint; the service answers with the session identifier that
//! publishes are then correlated against.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod routing;
pub mod session;
pub mod transport;

pub use client::ProvenanceClient;
pub use context::{EnvReader, SnapshotReader, VariableReader};
pub use error::ProvenanceError;
pub use session::{create_session_request, SessionRequest, SessionResponse, SessionSource};
