//! Top-level client handle.

use hoist_api::{Build, Info, Operation, Team as ApiTeam};

use crate::connection::{ByteStream, Connection, ConnectionBuilder, Request};
use crate::error::{optional, Result};
use crate::events::EventSession;
use crate::pagination::{Page, Pagination};
use crate::team::Team;

/// A client for one hoist server.
///
/// Cheap to clone. Team-scoped operations hang off [`Client::team`].
#[derive(Debug, Clone)]
pub struct Client {
    connection: Connection,
}

/// Builder for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    inner: ConnectionBuilder,
}

impl ClientBuilder {
    /// Attach an opaque bearer credential to every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.token(token);
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.inner = self.inner.http_client(http);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        Ok(Client { connection: self.inner.build()? })
    }
}

impl Client {
    /// Start building a client for the given base URL.
    pub fn builder(base: impl AsRef<str>) -> Result<ClientBuilder> {
        Ok(ClientBuilder { inner: Connection::builder(base)? })
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// The underlying connection, for callers composing their own
    /// requests.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Scope to a team.
    pub fn team(&self, name: impl Into<String>) -> Team {
        Team::new(self.connection.clone(), name)
    }

    /// Server version info.
    pub async fn info(&self) -> Result<Info> {
        self.connection
            .send(Request::new(Operation::GetInfo))
            .await?
            .into_decoded()
    }

    /// All teams.
    pub async fn list_teams(&self) -> Result<Vec<ApiTeam>> {
        self.connection
            .send(Request::new(Operation::ListTeams))
            .await?
            .into_decoded()
    }

    /// Fetch a build by global ID. `Ok(None)` when it does not exist.
    pub async fn build(&self, id: u64) -> Result<Option<Build>> {
        let request = Request::new(Operation::GetBuild).param("build_id", id.to_string());
        let reply = optional(self.connection.send::<Build>(request).await)?;
        reply.map(|reply| reply.into_decoded()).transpose()
    }

    /// List builds across all teams, one page at a time.
    pub async fn builds(&self, page: Page) -> Result<(Vec<Build>, Pagination)> {
        let mut request = Request::new(Operation::ListBuilds).capture_headers();
        for (key, value) in page.to_query() {
            request = request.query(key, value);
        }

        let reply = self.connection.send::<Vec<Build>>(request).await?;
        let pagination = Pagination::from_headers(&reply.headers)?;
        Ok((reply.into_decoded()?, pagination))
    }

    /// Abort a running build. `Ok(false)` when the build does not exist.
    pub async fn abort_build(&self, id: u64) -> Result<bool> {
        let request = Request::new(Operation::AbortBuild).param("build_id", id.to_string());
        Ok(optional(self.connection.execute(request).await)?.is_some())
    }

    /// Open the live event feed for a build.
    pub async fn build_events(&self, id: u64) -> Result<EventSession> {
        let request = Request::new(Operation::BuildEvents).param("build_id", id.to_string());
        self.connection.connect_event_stream(request).await
    }

    /// Stream raw bytes into a build plan step's input.
    pub async fn send_build_input(
        &self,
        build_id: u64,
        plan_id: &str,
        body: impl Into<reqwest::Body>,
    ) -> Result<()> {
        let request = Request::new(Operation::SendBuildInput)
            .param("build_id", build_id.to_string())
            .param("plan_id", plan_id)
            .header("content-type", "application/octet-stream")
            .body(body);
        self.connection.execute(request).await?;
        Ok(())
    }

    /// Open a build plan step's raw output stream. The caller owns
    /// closing it (by dropping).
    pub async fn read_build_output(&self, build_id: u64, plan_id: &str) -> Result<ByteStream> {
        let request = Request::new(Operation::ReadBuildOutput)
            .param("build_id", build_id.to_string())
            .param("plan_id", plan_id)
            .raw_body();
        self.connection.send::<()>(request).await?.into_stream()
    }
}
