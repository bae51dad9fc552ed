//! Consumer side of the build event stream.
//!
//! A session wraps the open response body of a
//! [`connect_event_stream`](crate::Connection::connect_event_stream) call
//! and decodes frames as they arrive. Events are delivered exactly once,
//! in arrival order, to exactly one consumer; re-subscribing opens a new
//! session from scratch. Dropping the session closes the underlying
//! connection promptly: closing the transport is the unsubscribe.

use std::pin::Pin;

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use hoist_sse::END_EVENT;

use crate::error::{Error, Result};

/// One decoded event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID. IDs strictly increase within a session; gaps are
    /// possible, reordering is not.
    pub id: Option<u64>,
    /// Event name.
    pub name: String,
    /// Raw payload, typically JSON.
    pub data: String,
}

impl SseEvent {
    /// Decode the payload into a typed value.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).map_err(|e| Error::Decode(e.to_string()))
    }
}

type FrameStream =
    Pin<Box<dyn Stream<Item = Result<eventsource_stream::Event>> + Send>>;

fn map_frame_error<E: std::fmt::Display>(err: EventStreamError<E>) -> Error {
    match err {
        // A mid-stream read failure; the session is unusable.
        EventStreamError::Transport(e) => Error::Transport(e.to_string()),
        // The server sent bytes that are not a well-formed frame.
        other => Error::Decode(other.to_string()),
    }
}

/// A live event stream session. Single-pass, non-restartable.
pub struct EventSession {
    frames: FrameStream,
    ended: bool,
}

impl EventSession {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self::from_bytes(response.bytes_stream())
    }

    /// Wrap a pre-framed byte stream. The session takes ownership; it is
    /// closed by dropping.
    pub fn from_bytes<S, E>(bytes: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let frames = bytes.eventsource().map(|frame| frame.map_err(map_frame_error));
        Self { frames: Box::pin(frames), ended: false }
    }

    /// Wait for the next event.
    ///
    /// Returns `Ok(None)` once the reserved `end` sentinel arrives: the
    /// build is finished and the stream is over. A connection that closes
    /// without the sentinel, or fails mid-read, is an error: the caller
    /// must not mistake a dropped stream for a completed one.
    pub async fn next_event(&mut self) -> Result<Option<SseEvent>> {
        if self.ended {
            return Ok(None);
        }

        match self.frames.next().await {
            Some(Ok(frame)) => {
                if frame.event == END_EVENT {
                    debug!("event stream ended cleanly");
                    self.ended = true;
                    return Ok(None);
                }

                let id = if frame.id.is_empty() {
                    None
                } else {
                    Some(frame.id.parse::<u64>().map_err(|_| {
                        Error::Decode(format!("non-integer event id: {}", frame.id))
                    })?)
                };

                Ok(Some(SseEvent { id, name: frame.event, data: frame.data }))
            }
            Some(Err(err)) => Err(err),
            None => Err(Error::Transport(
                "event stream closed before the end-of-stream event".to_string(),
            )),
        }
    }

    /// Close the session, dropping the underlying connection. The server
    /// observes a broken pipe on its next flush and stops emitting; no
    /// unsubscribe message exists in the protocol.
    pub fn close(self) {}
}

impl std::fmt::Debug for EventSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSession")
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}
