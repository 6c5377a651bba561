//! Session Types and Request Builder
//!
//! A session is a server-side record correlating a package-feed publish with
//! the build or release that produced the packages. This module declares the
//! wire types and derives a [`SessionRequest`] from the pipeline context:
//! release context when a release id is present, build context otherwise.

use crate::context::VariableReader;
use crate::error::ProvenanceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COLLECTION_ID: &str = "System.CollectionId";
pub const TEAM_PROJECT_ID: &str = "System.TeamProjectId";

pub const RELEASE_ID: &str = "Release.ReleaseId";
pub const RELEASE_NAME: &str = "Release.ReleaseName";
pub const RELEASE_DEFINITION_NAME: &str = "Release.DefinitionName";
pub const RELEASE_DEFINITION_ID: &str = "Release.DefinitionId";

pub const BUILD_ID: &str = "Build.BuildId";
pub const BUILD_NUMBER: &str = "Build.BuildNumber";
pub const BUILD_DEFINITION_NAME: &str = "Build.DefinitionName";
pub const BUILD_REPOSITORY_NAME: &str = "Build.Repository.Name";
pub const BUILD_REPOSITORY_PROVIDER: &str = "Build.Repository.Provider";
pub const BUILD_REPOSITORY_ID: &str = "Build.Repository.Id";
pub const BUILD_SOURCE_BRANCH: &str = "Build.SourceBranch";
pub const BUILD_SOURCE_BRANCH_NAME: &str = "Build.SourceBranchName";
pub const BUILD_SOURCE_VERSION: &str = "Build.SourceVersion";

/// Kind of provenance context a session is created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionSource {
    InternalBuild,
    InternalRelease,
}

/// Payload submitted to the provenance service when creating a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// The feed name or id for the session
    pub feed: String,
    /// The kind of context the session was created from
    pub source: SessionSource,
    /// Context fields describing the build or release. Variables that were
    /// queried but absent are kept as explicit `null` entries.
    pub data: BTreeMap<String, Option<String>>,
}

/// Response returned by the provenance service for a created session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// The identifier for the session
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Build a [`SessionRequest`] from the current pipeline context.
///
/// A release id takes priority over a build id: a pipeline exposing a
/// release id is running inside a release composed of build artifacts, so
/// the release is the more specific execution frame. When neither id is
/// present there is no context to report and
/// [`ProvenanceError::MissingContext`] is returned.
pub fn create_session_request(
    reader: &dyn VariableReader,
    feed_id: &str,
) -> Result<SessionRequest, ProvenanceError> {
    if let Some(release_id) = reader.get_variable(RELEASE_ID) {
        return Ok(release_session_request(reader, feed_id, release_id));
    }

    if let Some(build_id) = reader.get_variable(BUILD_ID) {
        return Ok(build_session_request(reader, feed_id, build_id));
    }

    Err(ProvenanceError::MissingContext)
}

fn release_session_request(
    reader: &dyn VariableReader,
    feed_id: &str,
    release_id: String,
) -> SessionRequest {
    let mut data = BTreeMap::new();
    data.insert(COLLECTION_ID.to_string(), reader.get_variable(COLLECTION_ID));
    data.insert(
        TEAM_PROJECT_ID.to_string(),
        reader.get_variable(TEAM_PROJECT_ID),
    );
    data.insert(RELEASE_ID.to_string(), Some(release_id));
    data.insert(RELEASE_NAME.to_string(), reader.get_variable(RELEASE_NAME));
    data.insert(
        RELEASE_DEFINITION_NAME.to_string(),
        reader.get_variable(RELEASE_DEFINITION_NAME),
    );
    data.insert(
        RELEASE_DEFINITION_ID.to_string(),
        reader.get_variable(RELEASE_DEFINITION_ID),
    );

    SessionRequest {
        feed: feed_id.to_string(),
        source: SessionSource::InternalRelease,
        data,
    }
}

fn build_session_request(
    reader: &dyn VariableReader,
    feed_id: &str,
    build_id: String,
) -> SessionRequest {
    let mut data = BTreeMap::new();
    data.insert(COLLECTION_ID.to_string(), reader.get_variable(COLLECTION_ID));
    data.insert(
        TEAM_PROJECT_ID.to_string(),
        reader.get_variable(TEAM_PROJECT_ID),
    );
    data.insert(BUILD_ID.to_string(), Some(build_id));
    data.insert(BUILD_NUMBER.to_string(), reader.get_variable(BUILD_NUMBER));
    data.insert(
        BUILD_DEFINITION_NAME.to_string(),
        reader.get_variable(BUILD_DEFINITION_NAME),
    );
    data.insert(
        BUILD_REPOSITORY_NAME.to_string(),
        reader.get_variable(BUILD_REPOSITORY_NAME),
    );
    data.insert(
        BUILD_REPOSITORY_PROVIDER.to_string(),
        reader.get_variable(BUILD_REPOSITORY_PROVIDER),
    );
    data.insert(
        BUILD_REPOSITORY_ID.to_string(),
        reader.get_variable(BUILD_REPOSITORY_ID),
    );
    data.insert(
        BUILD_SOURCE_BRANCH.to_string(),
        reader.get_variable(BUILD_SOURCE_BRANCH),
    );
    data.insert(
        BUILD_SOURCE_BRANCH_NAME.to_string(),
        reader.get_variable(BUILD_SOURCE_BRANCH_NAME),
    );
    data.insert(
        BUILD_SOURCE_VERSION.to_string(),
        reader.get_variable(BUILD_SOURCE_VERSION),
    );

    SessionRequest {
        feed: feed_id.to_string(),
        source: SessionSource::InternalBuild,
        data,
    }
}
