//! Build event payloads carried over the event stream.
//!
//! On the wire every event is an envelope `{"event": <name>, "data": ...}`.
//! Known event names decode into typed variants; anything else is kept
//! opaque so old clients keep working when the server grows new events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::BuildStatus;

/// The wire envelope for a single build event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event name, e.g. `"log"` or `"status"`.
    pub event: String,
    /// Event payload; schema depends on the event name.
    pub data: Value,
}

/// A typed build event.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEvent {
    /// A chunk of build output.
    Log {
        /// The emitted text.
        payload: String,
    },
    /// A build status transition.
    Status {
        /// The new status.
        status: BuildStatus,
    },
    /// A build-level error.
    Error {
        /// Human-readable error message.
        message: String,
    },
    /// An event this client version does not know about.
    Unknown {
        /// Event name as sent.
        name: String,
        /// Raw payload.
        data: Value,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct LogData {
    payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusData {
    status: BuildStatus,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorData {
    message: String,
}

impl BuildEvent {
    /// Decode an envelope into a typed event. Unknown names are preserved
    /// opaquely; a payload that fails its known schema is an error.
    pub fn from_envelope(envelope: EventEnvelope) -> Result<Self, serde_json::Error> {
        match envelope.event.as_str() {
            "log" => {
                let data: LogData = serde_json::from_value(envelope.data)?;
                Ok(BuildEvent::Log { payload: data.payload })
            }
            "status" => {
                let data: StatusData = serde_json::from_value(envelope.data)?;
                Ok(BuildEvent::Status { status: data.status })
            }
            "error" => {
                let data: ErrorData = serde_json::from_value(envelope.data)?;
                Ok(BuildEvent::Error { message: data.message })
            }
            _ => Ok(BuildEvent::Unknown { name: envelope.event, data: envelope.data }),
        }
    }

    /// Encode a typed event into its wire envelope.
    pub fn into_envelope(self) -> Result<EventEnvelope, serde_json::Error> {
        let (event, data) = match self {
            BuildEvent::Log { payload } => {
                ("log".to_string(), serde_json::to_value(LogData { payload })?)
            }
            BuildEvent::Status { status } => {
                ("status".to_string(), serde_json::to_value(StatusData { status })?)
            }
            BuildEvent::Error { message } => {
                ("error".to_string(), serde_json::to_value(ErrorData { message })?)
            }
            BuildEvent::Unknown { name, data } => (name, data),
        };

        Ok(EventEnvelope { event, data })
    }
}
