//! Producer side of the event stream.

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::frame::{Frame, END_EVENT};

/// Errors from writing an event stream.
#[derive(Debug, Error)]
pub enum SseError {
    /// The payload could not be serialized. The structural contract is
    /// broken, so the whole stream fails rather than emitting a malformed
    /// frame.
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The underlying transport failed; typically a broken pipe once the
    /// consumer has closed its end.
    #[error("failed to write event frame: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes ID-tagged, named event frames to a sink, flushing after every
/// frame so consumers see events at line-level latency. No batching.
#[derive(Debug)]
pub struct EventWriter<W> {
    sink: W,
}

impl<W: AsyncWrite + Unpin> EventWriter<W> {
    /// Wrap a sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Emit one event frame and flush it.
    ///
    /// The payload is serialized before anything is written; a
    /// serialization failure aborts the write with nothing emitted.
    pub async fn emit<T: Serialize>(
        &mut self,
        id: u64,
        name: &str,
        payload: &T,
    ) -> Result<(), SseError> {
        let data = serde_json::to_string(payload)?;

        let frame = Frame { id: Some(id), name: name.to_string(), data };
        self.write_frame(&frame).await
    }

    /// Emit the terminal `end` sentinel. After this the stream is over;
    /// the consumer treats a close without it as a dropped connection.
    pub async fn end(&mut self, id: u64) -> Result<(), SseError> {
        debug!(id, "ending event stream");
        let frame = Frame { id: Some(id), name: END_EVENT.to_string(), data: String::new() };
        self.write_frame(&frame).await
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<(), SseError> {
        self.sink.write_all(frame.encode().as_bytes()).await?;
        self.sink.flush().await?;
        Ok(())
    }

    /// Consume the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use eventsource_stream::Eventsource;
    use futures::StreamExt;
    use serde_json::json;

    async fn decode_all(wire: Vec<u8>) -> Vec<eventsource_stream::Event> {
        let byte_stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(wire))]);
        byte_stream
            .eventsource()
            .map(|result| result.expect("well-formed frame"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn emits_ordered_frames_with_terminal_sentinel() {
        let mut writer = EventWriter::new(Vec::new());

        writer.emit(1, "status", &json!({"x": 1})).await.unwrap();
        writer.emit(2, "status", &json!({"x": 2})).await.unwrap();
        writer.end(2).await.unwrap();

        let events = decode_all(writer.into_inner()).await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].event, "status");
        assert_eq!(events[0].data, r#"{"x":1}"#);
        assert_eq!(events[1].id, "2");
        assert_eq!(events[1].data, r#"{"x":2}"#);
        assert_eq!(events[2].event, END_EVENT);
        assert_eq!(events[2].data, "");
    }

    #[tokio::test]
    async fn serialization_failure_writes_nothing() {
        // A map with non-string keys cannot serialize to JSON.
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], "x");

        let mut writer = EventWriter::new(Vec::new());
        let err = writer.emit(1, "status", &bad).await.unwrap_err();
        assert!(matches!(err, SseError::Serialize(_)));
        assert!(writer.into_inner().is_empty());
    }
}
