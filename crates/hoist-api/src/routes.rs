//! The route table: logical operation names mapped to HTTP routes.
//!
//! Every request the client sends resolves through this table. The set of
//! operations is a closed enum, so "unknown operation" is unrepresentable
//! rather than a runtime error.

use http::Method;

/// A single entry in the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// HTTP method for the operation.
    pub method: Method,
    /// Path template. Segments of the form `{name}` are substituted from
    /// the request's path parameters, verbatim.
    pub path: &'static str,
}

/// A logical API operation.
///
/// Each operation corresponds to exactly one [`Route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Server version and capability info.
    GetInfo,
    /// List all teams.
    ListTeams,

    /// Fetch a single build by its global ID.
    GetBuild,
    /// List builds across all teams, paginated.
    ListBuilds,
    /// Create a one-off build from a plan.
    CreateBuild,
    /// Open the server-sent-event feed for a build.
    BuildEvents,
    /// Abort a running build.
    AbortBuild,
    /// Stream raw bytes into a build plan step's input.
    SendBuildInput,
    /// Stream a build plan step's raw output.
    ReadBuildOutput,

    /// List pipelines in a team.
    ListPipelines,
    /// Fetch a single pipeline.
    GetPipeline,
    /// Delete a pipeline.
    DeletePipeline,
    /// Pause scheduling for a pipeline.
    PausePipeline,
    /// Resume scheduling for a pipeline.
    UnpausePipeline,

    /// List jobs in a pipeline.
    ListJobs,
    /// Fetch a single job.
    GetJob,
    /// List a job's builds, paginated.
    ListJobBuilds,
    /// Trigger a new build of a job.
    CreateJobBuild,

    /// Fetch a pipeline's config together with its version header.
    GetConfig,
    /// Set a pipeline's config, guarded by the version header.
    SaveConfig,

    /// Upload an artifact as a compressed tar stream.
    CreateArtifact,
    /// Download an artifact as a compressed tar stream.
    GetArtifact,
}

impl Operation {
    /// Resolve this operation against the route table.
    pub fn route(self) -> Route {
        let (method, path) = match self {
            Operation::GetInfo => (Method::GET, "/api/v1/info"),
            Operation::ListTeams => (Method::GET, "/api/v1/teams"),

            Operation::GetBuild => (Method::GET, "/api/v1/builds/{build_id}"),
            Operation::ListBuilds => (Method::GET, "/api/v1/builds"),
            Operation::CreateBuild => (Method::POST, "/api/v1/teams/{team_name}/builds"),
            Operation::BuildEvents => (Method::GET, "/api/v1/builds/{build_id}/events"),
            Operation::AbortBuild => (Method::PUT, "/api/v1/builds/{build_id}/abort"),
            Operation::SendBuildInput => {
                (Method::PUT, "/api/v1/builds/{build_id}/plan/{plan_id}/input")
            }
            Operation::ReadBuildOutput => {
                (Method::GET, "/api/v1/builds/{build_id}/plan/{plan_id}/output")
            }

            Operation::ListPipelines => (Method::GET, "/api/v1/teams/{team_name}/pipelines"),
            Operation::GetPipeline => {
                (Method::GET, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}")
            }
            Operation::DeletePipeline => {
                (Method::DELETE, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}")
            }
            Operation::PausePipeline => {
                (Method::PUT, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/pause")
            }
            Operation::UnpausePipeline => {
                (Method::PUT, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/unpause")
            }

            Operation::ListJobs => {
                (Method::GET, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/jobs")
            }
            Operation::GetJob => (
                Method::GET,
                "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/jobs/{job_name}",
            ),
            Operation::ListJobBuilds => (
                Method::GET,
                "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/jobs/{job_name}/builds",
            ),
            Operation::CreateJobBuild => (
                Method::POST,
                "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/jobs/{job_name}/builds",
            ),

            Operation::GetConfig => {
                (Method::GET, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/config")
            }
            Operation::SaveConfig => {
                (Method::PUT, "/api/v1/teams/{team_name}/pipelines/{pipeline_name}/config")
            }

            Operation::CreateArtifact => (Method::POST, "/api/v1/teams/{team_name}/artifacts"),
            Operation::GetArtifact => {
                (Method::GET, "/api/v1/teams/{team_name}/artifacts/{artifact_id}")
            }
        };

        Route { method, path }
    }
}
