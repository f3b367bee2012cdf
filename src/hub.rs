// src/hub.rs

//! Session registry and fan-out.
//!
//! A [`Hub`] owns the shared configuration and handler set, hands out session
//! handles, and drives each connection's pump pair via [`Hub::run_session`].
//! Broadcasts walk a snapshot of the registry so no registry lock is held
//! while user handlers run.

use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::TetherError;
use crate::handlers::{Handlers, Shared};
use crate::metadata::Metadata;
use crate::pump::{read_pump, write_pump};
use crate::session::Session;
use crate::transport::Transport;

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Accepts transports and turns each into a running [`Session`].
///
/// The hub is shared-reference friendly: every method takes `&self`, so a
/// typical server wraps it in an [`Arc`] and calls [`run_session`] from each
/// accept-loop task.
///
/// [`run_session`]: Hub::run_session
pub struct Hub {
  shared: Arc<Shared>,
  sessions: RwLock<HashMap<usize, Session>>,
  next_handle: AtomicUsize,
  open: RwLock<bool>,
}

impl Hub {
  pub fn builder() -> HubBuilder {
    HubBuilder::new()
  }

  /// Runs one connection to completion. Registers a session for the
  /// transport, fires the connect handler, then pumps until the session
  /// closes; the disconnect handler fires after both pumps have stopped and
  /// the session has left the registry.
  pub async fn run_session(
    &self,
    transport: impl Transport + 'static,
    metadata: Metadata,
  ) -> Result<(), TetherError> {
    if self.is_closed() {
      return Err(TetherError::HubClosed);
    }
    let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
    let (session, mailbox) = Session::new(Arc::new(transport), metadata, self.shared.clone(), handle);

    self.sessions.write().insert(handle, session.clone());
    tracing::debug!(session = handle, live = self.len(), "session registered");
    self.shared.connect(&session);

    let writer = tokio::spawn(write_pump(session.clone(), mailbox));
    read_pump(session.clone()).await;

    // The read pump has driven the close transition by now; the write pump
    // drains out through its closed mailbox.
    if writer.await.is_err() {
      tracing::error!(session = handle, "write pump task panicked");
    }

    self.sessions.write().remove(&handle);
    tracing::debug!(session = handle, live = self.len(), "session deregistered");
    self.shared.disconnect(&session);
    Ok(())
  }

  /// Queues a text message on every registered session. Per-session failures
  /// (full mailbox, racing close) are reported to the error handler by the
  /// session itself and do not abort the fan-out.
  pub fn broadcast(&self, payload: impl Into<Bytes>) -> Result<(), TetherError> {
    self.fan_out(Envelope::text(payload), |_| true)
  }

  /// Queues a binary message on every registered session.
  pub fn broadcast_binary(&self, payload: impl Into<Bytes>) -> Result<(), TetherError> {
    self.fan_out(Envelope::binary(payload), |_| true)
  }

  /// Queues a text message on every session the predicate selects.
  pub fn broadcast_filter(
    &self,
    payload: impl Into<Bytes>,
    predicate: impl Fn(&Session) -> bool,
  ) -> Result<(), TetherError> {
    self.fan_out(Envelope::text(payload), predicate)
  }

  /// Queues a text message on every session except the given one.
  pub fn broadcast_others(
    &self,
    payload: impl Into<Bytes>,
    except: &Session,
  ) -> Result<(), TetherError> {
    let except = except.handle();
    self.fan_out(Envelope::text(payload), move |session| {
      session.handle() != except
    })
  }

  fn fan_out(
    &self,
    envelope: Envelope,
    predicate: impl Fn(&Session) -> bool,
  ) -> Result<(), TetherError> {
    if self.is_closed() {
      return Err(TetherError::HubClosed);
    }
    let sessions = self.snapshot();
    tracing::trace!(kind = ?envelope.kind(), fanout = sessions.len(), "broadcast");
    for session in sessions {
      if predicate(&session) {
        let _ = session.enqueue(envelope.clone());
      }
    }
    Ok(())
  }

  /// Number of currently registered sessions.
  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }

  pub fn is_closed(&self) -> bool {
    !*self.open.read()
  }

  /// Closes the hub and every registered session with an empty close payload.
  pub fn close(&self) -> Result<(), TetherError> {
    self.close_with_payload(Bytes::new())
  }

  /// Closes the hub: new sessions and broadcasts are refused, and every
  /// registered session is asked to close with the given payload. Sessions
  /// whose mailbox cannot take the close message are torn down directly.
  pub fn close_with_payload(&self, payload: impl Into<Bytes>) -> Result<(), TetherError> {
    {
      let mut open = self.open.write();
      if !*open {
        return Err(TetherError::HubClosed);
      }
      *open = false;
    }
    let payload = payload.into();
    let sessions = self.snapshot();
    tracing::debug!(live = sessions.len(), "hub closing");
    for session in sessions {
      if session.close_with_payload(payload.clone()).is_err() {
        session.perform_close();
      }
    }
    Ok(())
  }

  fn snapshot(&self) -> Vec<Session> {
    self.sessions.read().values().cloned().collect()
  }
}

impl fmt::Debug for Hub {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hub")
      .field("sessions", &self.len())
      .field("closed", &self.is_closed())
      .finish()
  }
}

/// Configures and builds a [`Hub`].
///
/// Handler slots left unset stay inert, except the error handler, which
/// defaults to logging through `tracing`.
pub struct HubBuilder {
  config: Config,
  handlers: Handlers,
}

impl HubBuilder {
  pub fn new() -> Self {
    Self {
      config: Config::default(),
      handlers: Handlers::default(),
    }
  }

  pub fn config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  /// Replaces the default logging error handler.
  pub fn on_error(mut self, handler: impl Fn(&Session, &TetherError) + Send + Sync + 'static) -> Self {
    self.handlers.on_error = Arc::new(handler);
    self
  }

  /// Fires after a session is registered, before its pumps start.
  pub fn on_connect(mut self, handler: impl Fn(&Session) + Send + Sync + 'static) -> Self {
    self.handlers.on_connect = Some(Arc::new(handler));
    self
  }

  /// Fires after both pumps have stopped and the session is deregistered.
  pub fn on_disconnect(mut self, handler: impl Fn(&Session) + Send + Sync + 'static) -> Self {
    self.handlers.on_disconnect = Some(Arc::new(handler));
    self
  }

  /// Fires for each inbound text message.
  pub fn on_message(mut self, handler: impl Fn(&Session, Bytes) + Send + Sync + 'static) -> Self {
    self.handlers.on_message = Some(Arc::new(handler));
    self
  }

  /// Fires for each inbound binary message.
  pub fn on_message_binary(
    mut self,
    handler: impl Fn(&Session, Bytes) + Send + Sync + 'static,
  ) -> Self {
    self.handlers.on_message_binary = Some(Arc::new(handler));
    self
  }

  /// Fires after a text message has been written to the transport.
  pub fn on_message_sent(
    mut self,
    handler: impl Fn(&Session, Bytes) + Send + Sync + 'static,
  ) -> Self {
    self.handlers.on_message_sent = Some(Arc::new(handler));
    self
  }

  /// Fires after a binary message has been written to the transport.
  pub fn on_message_sent_binary(
    mut self,
    handler: impl Fn(&Session, Bytes) + Send + Sync + 'static,
  ) -> Self {
    self.handlers.on_message_sent_binary = Some(Arc::new(handler));
    self
  }

  /// Fires whenever the peer answers a heartbeat.
  pub fn on_pong(mut self, handler: impl Fn(&Session) + Send + Sync + 'static) -> Self {
    self.handlers.on_pong = Some(Arc::new(handler));
    self
  }

  /// Fires when the peer requests a close, with the peer's payload.
  pub fn on_close_request(
    mut self,
    handler: impl Fn(&Session, Bytes) + Send + Sync + 'static,
  ) -> Self {
    self.handlers.on_close_request = Some(Arc::new(handler));
    self
  }

  pub fn build(self) -> Result<Hub, TetherError> {
    self.config.validate()?;
    Ok(Hub {
      shared: Arc::new(Shared {
        config: self.config,
        handlers: self.handlers,
      }),
      sessions: RwLock::new(HashMap::new()),
      next_handle: AtomicUsize::new(1),
      open: RwLock::new(true),
    })
  }
}

impl Default for HubBuilder {
  fn default() -> Self {
    Self::new()
  }
}
