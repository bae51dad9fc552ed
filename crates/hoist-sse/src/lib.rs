//! Server-sent-event wire protocol for hoist build event streams.
//!
//! One frame per event, blank-line delimited, flushed immediately:
//!
//! ```text
//! id: <n>
//! event: <name>
//! data: <json-or-empty>
//! ```
//!
//! The reserved event name [`END_EVENT`] signals clean termination; it is
//! the only way a consumer can tell "build finished" apart from "the
//! connection dropped".

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod frame;
pub mod writer;

pub use frame::{Frame, END_EVENT};
pub use writer::{EventWriter, SseError};
