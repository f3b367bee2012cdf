// src/session.rs

use crate::envelope::Envelope;
use crate::error::TetherError;
use crate::handlers::Shared;
use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender};
use crate::metadata::Metadata;
use crate::transport::Transport;

use async_channel::TrySendError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One live connection: a transport and its bounded outbound mailbox, with
/// the open/closed flag coordinating the two pumps.
///
/// `Session` is a cheap clonable handle over shared state; handlers and
/// producers may clone it freely and call it from any task. All send paths
/// are non-blocking: they either enqueue or fail fast, and every failure is
/// reported to the error handler before it is returned.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

struct SessionInner {
  transport: Arc<dyn Transport>,
  mailbox: MailboxSender,
  // True until the close transition runs. Readers take consistent snapshots;
  // the transition takes the write lock so flag, transport close and mailbox
  // close flip as one atomic step.
  open: RwLock<bool>,
  metadata: Metadata,
  shared: Arc<Shared>,
  handle: usize,
}

impl Session {
  pub(crate) fn new(
    transport: Arc<dyn Transport>,
    metadata: Metadata,
    shared: Arc<Shared>,
    handle: usize,
  ) -> (Self, MailboxReceiver) {
    let (tx, rx) = mailbox(shared.config.message_buffer_size);
    let session = Self {
      inner: Arc::new(SessionInner {
        transport,
        mailbox: tx,
        open: RwLock::new(true),
        metadata,
        shared,
        handle,
      }),
    };
    (session, rx)
  }

  /// Numeric id assigned by the hub; stable for the session's lifetime.
  pub fn handle(&self) -> usize {
    self.inner.handle
  }

  /// Queues a text message. Returns the number of payload bytes accepted.
  ///
  /// Fails with `SessionClosed` on a closed session and `MessageBufferFull`
  /// when the mailbox is saturated; the caller decides whether to back off or
  /// drop. Never blocks.
  pub fn send(&self, payload: impl Into<Bytes>) -> Result<usize, TetherError> {
    let payload = payload.into();
    if self.is_closed() {
      return Err(self.report(TetherError::SessionClosed));
    }
    let accepted = payload.len();
    self.enqueue(Envelope::text(payload))?;
    Ok(accepted)
  }

  /// Queues a binary message. Same contract as [`send`](Self::send).
  pub fn send_binary(&self, payload: impl Into<Bytes>) -> Result<(), TetherError> {
    if self.is_closed() {
      return Err(self.report(TetherError::SessionClosed));
    }
    self.enqueue(Envelope::binary(payload))
  }

  /// Requests a graceful close: queues a close message behind anything
  /// already accepted. The transport itself closes once the outbound pump
  /// has written the close message, so `is_closed` may lag this call.
  pub fn close(&self) -> Result<(), TetherError> {
    self.close_with_payload(Bytes::new())
  }

  /// As [`close`](Self::close), with an application-supplied close payload.
  /// The caller formats the payload per the wire protocol in use.
  pub fn close_with_payload(&self, payload: impl Into<Bytes>) -> Result<(), TetherError> {
    if self.is_closed() {
      return Err(self.report(TetherError::SessionAlreadyClosed));
    }
    self.enqueue(Envelope::close(payload))
  }

  /// Point-in-time snapshot of the close state, read under the shared lock.
  pub fn is_closed(&self) -> bool {
    !*self.inner.open.read()
  }

  /// Attaches arbitrary typed state to this session.
  pub fn set_value<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
    self.inner.metadata.insert(key, value);
  }

  /// Retrieves state stored with [`set_value`](Self::set_value).
  pub fn get_value<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
    self.inner.metadata.get(key)
  }

  /// As [`get_value`](Self::get_value) for keys that must exist.
  ///
  /// # Panics
  ///
  /// Panics if the key is absent or holds a value of another type. Reach for
  /// this only where an absent key is a programming error.
  pub fn must_get_value<T: Any + Send + Sync>(&self, key: &str) -> Arc<T> {
    match self.get_value(key) {
      Some(value) => value,
      None => panic!("session value {:?} is not set", key),
    }
  }

  /// The per-session key/value store, for callers that prefer direct access.
  pub fn metadata(&self) -> &Metadata {
    &self.inner.metadata
  }

  /// Non-blocking enqueue with the closed-race mapping: a mailbox that closed
  /// between the caller's open-check and here surfaces as
  /// `WriteToClosedSession`, never a panic.
  pub(crate) fn enqueue(&self, envelope: Envelope) -> Result<(), TetherError> {
    match self.inner.mailbox.try_send(envelope) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(_)) => Err(self.report(TetherError::MessageBufferFull)),
      Err(TrySendError::Closed(_)) => Err(self.report(TetherError::WriteToClosedSession)),
    }
  }

  /// Best-effort enqueue for pump-internal control replies. Drops are not
  /// reported: a full mailbox or a racing close is not the caller's fault.
  pub(crate) fn try_enqueue_control(&self, envelope: Envelope) -> bool {
    self.inner.mailbox.try_send(envelope).is_ok()
  }

  /// One deadline-bounded transport write. Outbound pump only.
  pub(crate) async fn write_raw(&self, envelope: Envelope) -> Result<(), TetherError> {
    if self.is_closed() {
      return Err(TetherError::WriteToClosedSession);
    }
    let write_wait = self.inner.shared.config.write_wait;
    match tokio::time::timeout(write_wait, self.inner.transport.write_message(envelope)).await {
      Ok(res) => res,
      Err(_) => Err(TetherError::WriteTimeout(write_wait)),
    }
  }

  /// The close transition: at most one caller flips the flag, then closes the
  /// transport (releasing the inbound pump's blocked read) and the mailbox
  /// (releasing the outbound pump's blocked receive), all under the writer
  /// lock. Returns whether this call performed the transition.
  pub(crate) fn perform_close(&self) -> bool {
    let mut open = self.inner.open.write();
    if !*open {
      return false;
    }
    *open = false;
    self.inner.transport.close();
    self.inner.mailbox.close();
    tracing::debug!(session = self.inner.handle, "session closed");
    true
  }

  /// Routes an error to the shared error handler, then hands it back so call
  /// sites can `return Err(self.report(...))`.
  pub(crate) fn report(&self, err: TetherError) -> TetherError {
    self.inner.shared.error(self, &err);
    err
  }

  /// Terminal fault path for the pumps: the error is reported only by the
  /// caller that performs the close transition. Both pumps can observe the
  /// same disconnect concurrently; the loser of the transition race stays
  /// quiet, so one disconnect reports at most once.
  pub(crate) fn report_terminal(&self, err: TetherError) {
    if self.perform_close() {
      self.inner.shared.error(self, &err);
    }
  }

  pub(crate) fn shared(&self) -> &Shared {
    &self.inner.shared
  }

  pub(crate) fn transport(&self) -> &dyn Transport {
    self.inner.transport.as_ref()
  }
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session")
      .field("handle", &self.inner.handle)
      .field("closed", &self.is_closed())
      .finish()
  }
}
