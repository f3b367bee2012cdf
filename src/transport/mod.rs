// src/transport/mod.rs

//! The byte-transport seam the session engine runs on.
//!
//! The engine is generic over anything that can move whole messages: it never
//! frames bytes itself. [`TcpTransport`] adapts a raw TCP stream with a
//! length-delimited codec; [`MockTransport`] is an in-memory pair for tests
//! and local wiring. Handshake and upgrade concerns live outside this crate;
//! by the time a transport reaches a session it must already be live.

pub mod mock;
pub mod tcp;

pub use mock::{mock_transport_pair, MockTransport};
pub use tcp::TcpTransport;

use crate::envelope::Envelope;
use crate::error::TetherError;

use async_trait::async_trait;

/// One live bidirectional message stream.
///
/// Contract, relied on by the pumps and the close transition:
/// - `read_message` is called by exactly one task at a time (the inbound
///   pump), `write_message` by exactly one (the outbound pump).
/// - `close` is synchronous and idempotent; it must release any read or write
///   blocked inside the transport, after which both operations fail with
///   [`TetherError::ConnectionClosed`].
/// - Deadlines are not the transport's business: the pumps bound every call
///   with runtime timers.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Blocks until one whole message arrives, the peer goes away, or the
  /// transport is closed locally.
  async fn read_message(&self) -> Result<Envelope, TetherError>;

  /// Writes one whole message.
  async fn write_message(&self, envelope: Envelope) -> Result<(), TetherError>;

  /// Caps the size of inbound messages; larger ones must surface as a read
  /// error. Called once by the inbound pump before its first read.
  fn set_read_limit(&self, limit: usize);

  /// Marks the transport closed and releases blocked operations.
  fn close(&self);
}
