// src/config.rs

use crate::error::TetherError;

use std::time::Duration;

/// Timing and sizing knobs shared by every session a hub serves.
///
/// The bundle is read-only once the hub is built; sessions hold it by shared
/// reference and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Maximum time a single transport write may take before the session is
  /// torn down.
  pub write_wait: Duration,
  /// Maximum idle time without a pong before the connection is presumed dead.
  pub pong_wait: Duration,
  /// Interval between heartbeat pings. Must be shorter than `pong_wait` so a
  /// live peer always has a ping to answer before the idle deadline expires.
  pub ping_period: Duration,
  /// Upper bound on a single inbound message, enforced by the transport.
  pub max_message_size: usize,
  /// Mailbox capacity: how many outbound envelopes may be queued before
  /// producers see `MessageBufferFull`.
  pub message_buffer_size: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      write_wait: Duration::from_secs(10),
      pong_wait: Duration::from_secs(60),
      // 9/10 of pong_wait, so a pong for the final ping can still arrive in time.
      ping_period: Duration::from_secs(54),
      max_message_size: 512,
      message_buffer_size: 256,
    }
  }
}

impl Config {
  /// Checks the cross-field constraints. Called once at hub construction.
  pub fn validate(&self) -> Result<(), TetherError> {
    if self.write_wait.is_zero() {
      return Err(TetherError::InvalidConfig("write_wait must be non-zero"));
    }
    if self.pong_wait.is_zero() {
      return Err(TetherError::InvalidConfig("pong_wait must be non-zero"));
    }
    if self.ping_period.is_zero() {
      return Err(TetherError::InvalidConfig("ping_period must be non-zero"));
    }
    if self.ping_period >= self.pong_wait {
      return Err(TetherError::InvalidConfig(
        "ping_period must be shorter than pong_wait",
      ));
    }
    if self.max_message_size == 0 {
      return Err(TetherError::InvalidConfig("max_message_size must be non-zero"));
    }
    if self.message_buffer_size == 0 {
      return Err(TetherError::InvalidConfig(
        "message_buffer_size must be at least 1",
      ));
    }
    Ok(())
  }
}
