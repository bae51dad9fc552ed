//! The request/response protocol layer.
//!
//! A [`Request`] names a logical operation plus its path parameters,
//! query, optional body, and headers; [`Connection::send`] resolves it
//! against the route table, performs exactly one network round trip, and
//! classifies the response into a typed [`Reply`] or a typed
//! [`Error`](crate::Error). There is no retry at this layer; retries, if
//! any, belong to the caller.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use hoist_api::{Operation, Route};

use crate::error::{Error, Result};
use crate::events::EventSession;

/// A logical API request, immutable once built. One per call.
#[derive(Debug)]
pub struct Request {
    operation: Operation,
    params: Vec<(&'static str, String)>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<reqwest::Body>,
    raw_body: bool,
    capture_headers: bool,
}

impl Request {
    /// Start a request for the given operation.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            params: Vec::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            raw_body: false,
            capture_headers: false,
        }
    }

    /// Supply a path parameter, substituted verbatim into the route's
    /// `{name}` placeholder. Escaping is the caller's responsibility.
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// Append a query pair, carried verbatim. The caller owns encoding.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header.
    ///
    /// # Panics
    /// Panics if the name or value is not a valid header token; that is a
    /// programming error, not a runtime condition.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name: HeaderName = name
            .parse()
            .unwrap_or_else(|e| panic!("invalid header name '{name}': {e}"));
        let value: HeaderValue = value
            .parse()
            .unwrap_or_else(|e| panic!("invalid header value '{value}': {e}"));
        self.headers.append(name, value);
        self
    }

    /// Set a JSON body, along with its `Content-Type`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::Decode(format!("failed to encode request body: {e}")))?;
        self.body = Some(bytes.into());
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Set a raw body. A `Content-Type` header must be supplied separately;
    /// the server cannot interpret an untyped body, so sending one without
    /// it is a programming error caught by [`Connection::send`].
    pub fn body(mut self, body: impl Into<reqwest::Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Ask for the raw response body instead of a JSON decode. Ownership
    /// of the open body transfers to the caller, who closes it by
    /// dropping the stream.
    pub fn raw_body(mut self) -> Self {
        self.raw_body = true;
        self
    }

    /// Ask for the response headers to be copied into the reply.
    pub fn capture_headers(mut self) -> Self {
        self.capture_headers = true;
        self
    }
}

/// What a successful call produced. At most one of a decoded value and a
/// raw stream, chosen by the request's raw-body flag.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The JSON body, decoded into the caller's type.
    Decoded(T),
    /// The open response body. The caller owns closing it.
    Stream(ByteStream),
    /// No content (204, or a drained fire-and-forget call).
    Empty,
}

/// A successful response.
#[derive(Debug)]
pub struct Reply<T> {
    /// The decoded value, raw stream, or nothing.
    pub outcome: Outcome<T>,
    /// True for `201 Created`, letting PUT-or-POST callers distinguish
    /// create from update on a single idempotent call.
    pub created: bool,
    /// Response headers, populated only when the request asked for them.
    /// Pairs are appended, so multi-valued headers survive.
    pub headers: HeaderMap,
}

impl<T> Reply<T> {
    /// Unwrap the decoded value.
    pub fn into_decoded(self) -> Result<T> {
        match self.outcome {
            Outcome::Decoded(value) => Ok(value),
            _ => Err(Error::Decode("expected a decoded response body".to_string())),
        }
    }

    /// Unwrap the raw stream.
    pub fn into_stream(self) -> Result<ByteStream> {
        match self.outcome {
            Outcome::Stream(stream) => Ok(stream),
            _ => Err(Error::Decode("expected a raw response body".to_string())),
        }
    }
}

/// An open response body as a stream of byte chunks. Dropping it closes
/// the underlying connection promptly, even mid-read.
pub struct ByteStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>,
}

impl ByteStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Transport(e.to_string())));
        Self { inner: Box::pin(stream) }
    }

    /// Wrap an arbitrary chunk stream. Used by tests and the artifact
    /// download path.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self { inner: Box::pin(stream) }
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

/// A connection to one server. Cheap to clone; all per-call state lives in
/// the [`Request`].
#[derive(Debug, Clone)]
pub struct Connection {
    base: Url,
    http: reqwest::Client,
    token: Option<String>,
}

/// Builder for [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    base: Url,
    token: Option<String>,
    http: Option<reqwest::Client>,
}

impl ConnectionBuilder {
    /// Supply an opaque bearer credential attached to every request.
    /// Token acquisition is entirely outside this layer.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a custom HTTP client, e.g. to configure deadlines or TLS.
    /// Timeouts are not enforced inside this layer.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the connection.
    pub fn build(self) -> Result<Connection> {
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| Error::Transport(e.to_string()))?,
        };

        Ok(Connection { base: self.base, http, token: self.token })
    }
}

impl Connection {
    /// Start building a connection to the given base URL. A trailing
    /// slash on the base is tolerated.
    pub fn builder(base: impl AsRef<str>) -> Result<ConnectionBuilder> {
        let base = Url::parse(base.as_ref())
            .map_err(|e| Error::Transport(format!("invalid base url: {e}")))?;
        Ok(ConnectionBuilder { base, token: None, http: None })
    }

    /// The server base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Send a request and decode the response into `T`.
    ///
    /// - `2xx` with the raw-body flag: the open body is handed back as
    ///   [`Outcome::Stream`] without being consumed.
    /// - `204`: [`Outcome::Empty`].
    /// - other `2xx`: JSON decode into `T`; a malformed body is
    ///   [`Error::Decode`], never a transport failure.
    /// - non-`2xx`: the body is drained and classified into a typed error.
    ///
    /// # Panics
    /// Panics if the request carries a body without a `Content-Type`
    /// header, or if a path parameter named by the route is missing.
    pub async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<Reply<T>> {
        let raw_body = request.raw_body;
        let capture = request.capture_headers;

        let response = self.round_trip(request).await?;
        let status = response.status();
        let created = status == StatusCode::CREATED;
        let headers = captured_headers(capture, &response);

        if raw_body {
            return Ok(Reply {
                outcome: Outcome::Stream(ByteStream::from_response(response)),
                created,
                headers,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Reply { outcome: Outcome::Empty, created, headers });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let value = serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))?;

        Ok(Reply { outcome: Outcome::Decoded(value), created, headers })
    }

    /// Send a request and discard any response body.
    pub async fn execute(&self, request: Request) -> Result<Reply<()>> {
        let capture = request.capture_headers;

        let response = self.round_trip(request).await?;
        let created = response.status() == StatusCode::CREATED;
        let headers = captured_headers(capture, &response);

        // Drain so the connection can go back to the pool.
        response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Reply { outcome: Outcome::Empty, created, headers })
    }

    /// Open a long-lived event stream for the given request.
    ///
    /// The handshake happens here: an auth failure (401/403) or any other
    /// bad status is a construction error, before a single frame is read.
    pub async fn connect_event_stream(&self, request: Request) -> Result<EventSession> {
        let request = request.header(ACCEPT.as_str(), "text/event-stream");
        let response = self.round_trip(request).await?;
        Ok(EventSession::new(response))
    }

    /// One network round trip: resolve the route, send, classify.
    async fn round_trip(&self, request: Request) -> Result<reqwest::Response> {
        let route = request.operation.route();
        let url = self.url_for(&route, &request);

        assert!(
            request.body.is_none() || request.headers.contains_key(CONTENT_TYPE),
            "request body for {:?} requires an explicit Content-Type header",
            request.operation,
        );

        debug!(operation = ?request.operation, method = %route.method, url = %url, "sending request");

        let mut builder = self.http.request(route.method, url).headers(request.headers);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Drain the body; it feeds the classifier and frees the socket.
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        warn!(operation = ?request.operation, status = status.as_u16(), "request failed");
        Err(Error::classify(status, body))
    }

    /// Substitute path parameters into the route template and attach the
    /// query string verbatim.
    ///
    /// # Panics
    /// Panics if a `{placeholder}` remains unsubstituted; a missing path
    /// parameter is a programming error, not a runtime condition.
    fn url_for(&self, route: &Route, request: &Request) -> Url {
        let mut path = route.path.to_string();
        for (name, value) in &request.params {
            path = path.replace(&format!("{{{name}}}"), value);
        }

        assert!(
            !path.contains('{'),
            "missing path parameter for {:?}: {path}",
            request.operation,
        );

        // The template is absolute, so joining replaces the base's path
        // outright; a trailing slash on the base cannot double up.
        let mut url = self
            .base
            .join(&path)
            .unwrap_or_else(|e| panic!("unroutable path {path}: {e}"));

        if !request.query.is_empty() {
            let joined = request
                .query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&joined));
        }

        url
    }
}

fn captured_headers(capture: bool, response: &reqwest::Response) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if capture {
        for (name, value) in response.headers() {
            headers.append(name, value.clone());
        }
    }
    headers
}
