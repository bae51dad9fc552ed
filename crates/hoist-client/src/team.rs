//! Team-scoped operations.

use std::path::Path;

use hoist_api::{
    Artifact, Build, ConfigResponse, Job, Operation, Pipeline, CONFIG_VERSION_HEADER,
};

use crate::artifacts::{self, FileSelection};
use crate::connection::{ByteStream, Connection, Request};
use crate::error::{optional, Error, Result};
use crate::pagination::{Page, Pagination};

/// Outcome of a [`Team::set_config`] call: the same idempotent PUT either
/// creates a pipeline or updates an existing one, and the server's status
/// code says which happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigUpdate {
    /// The pipeline did not exist before.
    Created,
    /// An existing pipeline's config was replaced.
    Updated,
}

/// Handle for one team's resources.
#[derive(Debug, Clone)]
pub struct Team {
    connection: Connection,
    name: String,
}

impl Team {
    pub(crate) fn new(connection: Connection, name: impl Into<String>) -> Self {
        Self { connection, name: name.into() }
    }

    /// The team name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn request(&self, operation: Operation) -> Request {
        Request::new(operation).param("team_name", self.name.clone())
    }

    /// Create a one-off build from a plan. The plan document is opaque to
    /// this layer.
    pub async fn create_build(&self, plan: &serde_json::Value) -> Result<Build> {
        self.connection
            .send(self.request(Operation::CreateBuild).json(plan)?)
            .await?
            .into_decoded()
    }

    /// Pipelines in this team.
    pub async fn list_pipelines(&self) -> Result<Vec<Pipeline>> {
        self.connection
            .send(self.request(Operation::ListPipelines))
            .await?
            .into_decoded()
    }

    /// Fetch a pipeline. `Ok(None)` when it does not exist.
    pub async fn pipeline(&self, pipeline: &str) -> Result<Option<Pipeline>> {
        let request = self
            .request(Operation::GetPipeline)
            .param("pipeline_name", pipeline);
        let reply = optional(self.connection.send::<Pipeline>(request).await)?;
        reply.map(|reply| reply.into_decoded()).transpose()
    }

    /// Delete a pipeline. `Ok(false)` when it did not exist.
    pub async fn delete_pipeline(&self, pipeline: &str) -> Result<bool> {
        let request = self
            .request(Operation::DeletePipeline)
            .param("pipeline_name", pipeline);
        Ok(optional(self.connection.execute(request).await)?.is_some())
    }

    /// Pause scheduling for a pipeline. `Ok(false)` when it does not
    /// exist.
    pub async fn pause_pipeline(&self, pipeline: &str) -> Result<bool> {
        let request = self
            .request(Operation::PausePipeline)
            .param("pipeline_name", pipeline);
        Ok(optional(self.connection.execute(request).await)?.is_some())
    }

    /// Resume scheduling for a pipeline. `Ok(false)` when it does not
    /// exist.
    pub async fn unpause_pipeline(&self, pipeline: &str) -> Result<bool> {
        let request = self
            .request(Operation::UnpausePipeline)
            .param("pipeline_name", pipeline);
        Ok(optional(self.connection.execute(request).await)?.is_some())
    }

    /// Jobs in a pipeline.
    pub async fn list_jobs(&self, pipeline: &str) -> Result<Vec<Job>> {
        let request = self
            .request(Operation::ListJobs)
            .param("pipeline_name", pipeline);
        self.connection.send(request).await?.into_decoded()
    }

    /// Fetch a job. `Ok(None)` when it does not exist.
    pub async fn job(&self, pipeline: &str, job: &str) -> Result<Option<Job>> {
        let request = self
            .request(Operation::GetJob)
            .param("pipeline_name", pipeline)
            .param("job_name", job);
        let reply = optional(self.connection.send::<Job>(request).await)?;
        reply.map(|reply| reply.into_decoded()).transpose()
    }

    /// A job's builds, one page at a time.
    pub async fn list_job_builds(
        &self,
        pipeline: &str,
        job: &str,
        page: Page,
    ) -> Result<(Vec<Build>, Pagination)> {
        let mut request = self
            .request(Operation::ListJobBuilds)
            .param("pipeline_name", pipeline)
            .param("job_name", job)
            .capture_headers();
        for (key, value) in page.to_query() {
            request = request.query(key, value);
        }

        let reply = self.connection.send::<Vec<Build>>(request).await?;
        let pagination = Pagination::from_headers(&reply.headers)?;
        Ok((reply.into_decoded()?, pagination))
    }

    /// Trigger a new build of a job.
    pub async fn create_job_build(&self, pipeline: &str, job: &str) -> Result<Build> {
        let request = self
            .request(Operation::CreateJobBuild)
            .param("pipeline_name", pipeline)
            .param("job_name", job);
        self.connection.send(request).await?.into_decoded()
    }

    /// Fetch a pipeline's config and its version, for handing back to
    /// [`Team::set_config`]. `Ok(None)` when the pipeline does not exist.
    pub async fn config(&self, pipeline: &str) -> Result<Option<(ConfigResponse, String)>> {
        let request = self
            .request(Operation::GetConfig)
            .param("pipeline_name", pipeline)
            .capture_headers();

        let Some(reply) = optional(self.connection.send::<ConfigResponse>(request).await)?
        else {
            return Ok(None);
        };

        let version = reply
            .headers
            .get(CONFIG_VERSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Decode("response is missing the config version header".to_string())
            })?;

        Ok(Some((reply.into_decoded()?, version)))
    }

    /// Set a pipeline's config. `version` is the value last seen from
    /// [`Team::config`] (empty for a brand-new pipeline); the server
    /// rejects the write if someone else changed the config in between.
    pub async fn set_config(
        &self,
        pipeline: &str,
        version: &str,
        config: &serde_json::Value,
    ) -> Result<ConfigUpdate> {
        let request = self
            .request(Operation::SaveConfig)
            .param("pipeline_name", pipeline)
            .header(CONFIG_VERSION_HEADER, version)
            .json(config)?;

        let reply = self.connection.execute(request).await?;
        Ok(if reply.created { ConfigUpdate::Created } else { ConfigUpdate::Updated })
    }

    /// Upload a directory as a compressed tar artifact, streaming it as
    /// it is packed.
    pub async fn create_artifact(
        &self,
        dir: impl AsRef<Path>,
        selection: FileSelection,
    ) -> Result<Artifact> {
        let stream = artifacts::archive_stream(dir.as_ref(), selection);
        let request = self
            .request(Operation::CreateArtifact)
            .header("content-type", "application/gzip")
            .body(reqwest::Body::wrap_stream(stream));

        self.connection.send(request).await?.into_decoded()
    }

    /// Open an artifact's compressed tar stream. The caller owns closing
    /// it (by dropping).
    pub async fn artifact(&self, id: u64) -> Result<ByteStream> {
        let request = self
            .request(Operation::GetArtifact)
            .param("artifact_id", id.to_string())
            .raw_body();
        self.connection.send::<()>(request).await?.into_stream()
    }

    /// Download an artifact and unpack it into `dest` without staging the
    /// archive.
    pub async fn download_artifact(&self, id: u64, dest: impl AsRef<Path>) -> Result<()> {
        let stream = self.artifact(id).await?;
        artifacts::extract(stream, dest.as_ref()).await
    }
}
