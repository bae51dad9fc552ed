//! Shared API data model for the hoist CI/CD server.
//!
//! This crate carries the pieces that both sides of the wire agree on:
//! the route table mapping logical operations to HTTP method/path pairs,
//! the JSON resource types, the build-event payloads, and the well-known
//! header names. It performs no I/O of its own.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod events;
pub mod routes;
pub mod types;

pub use events::{BuildEvent, EventEnvelope};
pub use routes::{Operation, Route};
pub use types::{
    Artifact, Build, BuildStatus, ConfigResponse, ErrorList, Info, Job, Pipeline, Team,
    CONFIG_VERSION_HEADER,
};
