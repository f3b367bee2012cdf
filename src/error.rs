// src/error.rs

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Unified error type for every fallible operation in the crate.
///
/// Session-level variants are recoverable signals to the producer; transport
/// variants are terminal for the pump that observed them and drive the close
/// transition.
#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum TetherError {
  // --- Session Errors ---
  #[error("tried to write to a closed session")]
  WriteToClosedSession, // Enqueue raced the close transition, or a raw write landed after it

  #[error("session message buffer is full")]
  MessageBufferFull, // Back-pressure signal; the caller decides to drop or retry

  #[error("session is closed")]
  SessionClosed, // Send attempted on a session already observed closed

  #[error("session is already closed")]
  SessionAlreadyClosed, // Close requested twice

  // --- Hub Errors ---
  #[error("hub is closed")]
  HubClosed,

  // --- Configuration Errors ---
  #[error("invalid configuration: {0}")]
  InvalidConfig(&'static str),

  // --- Timeouts ---
  #[error("write did not complete within {0:?}")]
  WriteTimeout(Duration),

  #[error("no pong received within {0:?}, connection presumed dead")]
  PongTimeout(Duration),

  // --- Transport Errors ---
  #[error("connection closed by peer or transport")]
  ConnectionClosed, // EPIPE, ECONNRESET equivalents

  #[error("inbound message of {size} bytes exceeds the {limit} byte limit")]
  MessageTooLarge { size: usize, limit: usize },

  #[error("protocol violation: {0}")]
  Protocol(String), // Malformed or unknown frame on the wire

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

impl TetherError {
  /// Maps common `std::io::Error` kinds onto the closest crate variant.
  pub fn from_io(e: io::Error) -> Self {
    match e.kind() {
      io::ErrorKind::ConnectionReset
      | io::ErrorKind::ConnectionAborted
      | io::ErrorKind::BrokenPipe
      | io::ErrorKind::UnexpectedEof => TetherError::ConnectionClosed,
      _ => TetherError::Io(e),
    }
  }

  /// True for the variants a producer may retry after backing off.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, TetherError::MessageBufferFull)
  }
}
