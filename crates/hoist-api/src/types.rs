//! JSON resource types exchanged with the server.

use serde::{Deserialize, Serialize};

/// Response header carrying a pipeline config's version, used for
/// optimistic-concurrency checks on [`SaveConfig`](crate::Operation::SaveConfig).
pub const CONFIG_VERSION_HEADER: &str = "x-hoist-config-version";

/// Lifecycle status of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// Running.
    Started,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failing step.
    Failed,
    /// Finished due to an internal error.
    Errored,
    /// Cancelled by a user.
    Aborted,
}

/// A single build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    /// Globally unique build ID.
    pub id: u64,
    /// Name of the build within its job, or a one-off counter.
    pub name: String,
    /// Team that owns the build.
    pub team_name: String,
    /// Current status.
    pub status: BuildStatus,
    /// Job the build belongs to; absent for one-off builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    /// Pipeline the build belongs to; absent for one-off builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    /// API path for fetching this build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// A job within a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job name, unique within the pipeline.
    pub name: String,
    /// Whether scheduling is paused for this job.
    #[serde(default)]
    pub paused: bool,
    /// Most recently finished build, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_build: Option<Build>,
    /// Currently pending or running build, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_build: Option<Build>,
}

/// A pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name, unique within the team.
    pub name: String,
    /// Team that owns the pipeline.
    pub team_name: String,
    /// Whether scheduling is paused.
    #[serde(default)]
    pub paused: bool,
    /// Whether the pipeline is publicly viewable.
    #[serde(default)]
    pub public: bool,
}

/// A team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Team ID.
    pub id: u64,
    /// Team name.
    pub name: String,
}

/// An uploaded artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact ID, assigned by the server on upload.
    pub id: u64,
    /// Caller-supplied artifact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Build the artifact was produced by, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<u64>,
}

/// Server version info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// Server version.
    pub version: String,
    /// Minimum worker version the server accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_version: Option<String>,
}

/// Envelope returned by `GetConfig`. The config itself is opaque to the
/// transport layer; pipeline semantics live server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// The pipeline configuration document.
    pub config: serde_json::Value,
}

/// Structured error body returned by endpoints that validate their input,
/// e.g. `SaveConfig`. Decoded out of an unexpected-status error as a second
/// pass; the generic error remains if this decode fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorList {
    /// Human-readable error messages.
    pub errors: Vec<String>,
}
