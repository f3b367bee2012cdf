// src/lib.rs

//! tether - asynchronous session lifecycle management over message transports.
//!
//! This library owns the per-connection plumbing that sits between a framed,
//! bidirectional transport and application handlers: a bounded outbound
//! mailbox, a heartbeat loop, read-idle detection and a close transition that
//! is safe to race from any task. The [`Hub`] tracks every live [`Session`]
//! and fans broadcasts out to them.
//!
//! A session is driven by exactly two tasks. The write pump is the only task
//! that writes to the transport; it drains the mailbox and interleaves
//! heartbeat pings. The read pump is the only task that reads; it dispatches
//! inbound messages to handlers and expires the connection when the peer
//! stops answering pings. Producers never touch the transport and never
//! block: sends either enqueue or fail fast.
//!
//! # Example
//!
//! ```ignore
//! let hub = std::sync::Arc::new(
//!   tether::Hub::builder()
//!     .on_message(|session, payload| {
//!       let _ = session.send(payload); // echo
//!     })
//!     .build()?,
//! );
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:9191").await?;
//! loop {
//!   let (stream, _) = listener.accept().await?;
//!   let hub = hub.clone();
//!   tokio::spawn(async move {
//!     let transport = tether::TcpTransport::new(stream);
//!     hub.run_session(transport, tether::Metadata::new()).await
//!   });
//! }
//! ```

/// Tunable timeouts and capacities shared by every session of a hub.
pub mod config;
/// The unit queued, written and dispatched: a message kind plus payload.
pub mod envelope;
/// Defines custom error types used throughout the library.
pub mod error;
/// Handler slots and their invocation helpers.
pub mod handlers;
/// Session registry, broadcasts, and the per-connection driver.
pub mod hub;
/// String-keyed typed state attached to a session.
pub mod metadata;
/// The per-connection handle: sends, close, metadata access.
pub mod session;
/// The transport seam plus TCP and in-memory implementations.
pub mod transport;

mod mailbox;
mod pump;

// Re-export core types for user convenience, making them accessible directly
// from the crate root (e.g., `tether::TetherError`, `tether::Session`).
pub use config::Config;
pub use envelope::{Envelope, MessageKind};
pub use error::TetherError;
pub use handlers::{CloseRequestHandler, ErrorHandler, MessageHandler, SessionHandler};
pub use hub::{Hub, HubBuilder};
pub use metadata::Metadata;
pub use session::Session;
pub use transport::{mock_transport_pair, MockTransport, TcpTransport, Transport};

// --- Top-Level Library Information Functions ---

const VERSION_MAJOR: i32 = 0;
const VERSION_MINOR: i32 = 1;
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
///
/// # Examples
///
/// ```
/// let (major, minor, patch) = tether::version();
/// println!("tether version: {}.{}.{}", major, minor, patch);
/// ```
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}
