//! Client SDK for the hoist CI/CD server's HTTP API.
//!
//! This crate is the transport layer between a CLI (or any caller) and the
//! server: it turns logical operations into HTTP requests against the
//! route table, classifies responses into typed results or typed errors,
//! consumes the server-sent-event feed for live build output, and moves
//! artifacts as compressed tar streams without materializing them.
//!
//! # Example
//!
//! ```no_run
//! use hoist_client::Client;
//!
//! # async fn example() -> hoist_client::Result<()> {
//! let client = Client::builder("https://ci.example.com")?.build()?;
//!
//! if let Some(build) = client.build(42).await? {
//!     println!("build {} is {:?}", build.id, build.status);
//! }
//!
//! let mut events = client.build_events(42).await?;
//! while let Some(event) = events.next_event().await? {
//!     println!("{}: {}", event.name, event.data);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod artifacts;
pub mod bounded;
pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod pagination;
pub mod team;

pub use artifacts::{archive_stream, extract, FileSelection, DEFAULT_CHUNK_SIZE};
pub use bounded::BoundedWriter;
pub use client::{Client, ClientBuilder};
pub use connection::{ByteStream, Connection, ConnectionBuilder, Outcome, Reply, Request};
pub use error::{optional, Error, Result};
pub use events::{EventSession, SseEvent};
pub use pagination::{Page, Pagination};
pub use team::{ConfigUpdate, Team};
