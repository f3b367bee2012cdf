// src/envelope.rs

use bytes::Bytes;
use std::fmt;

/// Kind of a single wire message.
///
/// The public send surface only constructs `Text`, `Binary` and `Close`;
/// `Ping` comes from the heartbeat timer and `Pong` from the inbound pump's
/// automatic reply to a peer ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
  Text,
  Binary,
  Ping,
  Pong,
  Close,
}

impl MessageKind {
  /// True for heartbeat and close traffic, false for application payloads.
  pub fn is_control(&self) -> bool {
    matches!(self, MessageKind::Ping | MessageKind::Pong | MessageKind::Close)
  }
}

/// One outbound unit of work: a kind plus an immutable payload.
///
/// Envelopes are created by the session on every send/close call and by the
/// heartbeat timer, and consumed exactly once by the outbound pump. The
/// payload is a refcounted buffer, so cloning an envelope (e.g. for broadcast
/// fan-out) never copies message bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
  kind: MessageKind,
  payload: Bytes,
}

impl Envelope {
  pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
    Self {
      kind,
      payload: payload.into(),
    }
  }

  pub fn text(payload: impl Into<Bytes>) -> Self {
    Self::new(MessageKind::Text, payload)
  }

  pub fn binary(payload: impl Into<Bytes>) -> Self {
    Self::new(MessageKind::Binary, payload)
  }

  /// Heartbeat probe. Carries no payload.
  pub fn ping() -> Self {
    Self::new(MessageKind::Ping, Bytes::new())
  }

  /// Heartbeat reply, echoing the probe's payload.
  pub fn pong(payload: impl Into<Bytes>) -> Self {
    Self::new(MessageKind::Pong, payload)
  }

  /// Close notification. The caller formats the payload per the wire protocol
  /// in use; an empty payload is always acceptable.
  pub fn close(payload: impl Into<Bytes>) -> Self {
    Self::new(MessageKind::Close, payload)
  }

  pub fn kind(&self) -> MessageKind {
    self.kind
  }

  pub fn payload(&self) -> &Bytes {
    &self.payload
  }

  pub fn into_payload(self) -> Bytes {
    self.payload
  }

  pub fn size(&self) -> usize {
    self.payload.len()
  }
}

// Payload bytes stay out of logs; size is enough to correlate traffic.
impl fmt::Debug for Envelope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Envelope")
      .field("kind", &self.kind)
      .field("size", &self.payload.len())
      .finish()
  }
}
