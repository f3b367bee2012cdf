// src/handlers.rs

use crate::config::Config;
use crate::error::TetherError;
use crate::session::Session;

use bytes::Bytes;
use std::sync::Arc;

/// Invoked whenever a session operation fails or a pump observes a fault.
pub type ErrorHandler = Arc<dyn Fn(&Session, &TetherError) + Send + Sync>;
/// Invoked with a received or sent payload.
pub type MessageHandler = Arc<dyn Fn(&Session, Bytes) + Send + Sync>;
/// Invoked on session-scoped events that carry no payload (connect,
/// disconnect, pong).
pub type SessionHandler = Arc<dyn Fn(&Session) + Send + Sync>;
/// Invoked with the payload of a peer's close request, before teardown.
pub type CloseRequestHandler = Arc<dyn Fn(&Session, Bytes) + Send + Sync>;

/// The callback slots shared by every session of a hub.
///
/// All slots are optional except the error handler, which defaults to a
/// structured log line so failed sends stay visible even when the producer
/// ignores the returned error. Handlers run synchronously inside the pump
/// that detected the event; long blocking work in a handler stalls that
/// session's pump.
pub(crate) struct Handlers {
  pub(crate) on_error: ErrorHandler,
  pub(crate) on_connect: Option<SessionHandler>,
  pub(crate) on_disconnect: Option<SessionHandler>,
  pub(crate) on_message: Option<MessageHandler>,
  pub(crate) on_message_binary: Option<MessageHandler>,
  pub(crate) on_message_sent: Option<MessageHandler>,
  pub(crate) on_message_sent_binary: Option<MessageHandler>,
  pub(crate) on_pong: Option<SessionHandler>,
  pub(crate) on_close_request: Option<CloseRequestHandler>,
}

impl Default for Handlers {
  fn default() -> Self {
    Self {
      on_error: Arc::new(|session, err| {
        tracing::error!(session = session.handle(), err = %err, "session error");
      }),
      on_connect: None,
      on_disconnect: None,
      on_message: None,
      on_message_binary: None,
      on_message_sent: None,
      on_message_sent_binary: None,
      on_pong: None,
      on_close_request: None,
    }
  }
}

/// Immutable config + handler bundle, assembled by the hub builder and shared
/// by `Arc` across all of its sessions.
pub(crate) struct Shared {
  pub(crate) config: Config,
  pub(crate) handlers: Handlers,
}

impl Shared {
  pub(crate) fn error(&self, session: &Session, err: &TetherError) {
    (self.handlers.on_error)(session, err);
  }

  pub(crate) fn connect(&self, session: &Session) {
    if let Some(h) = &self.handlers.on_connect {
      h(session);
    }
  }

  pub(crate) fn disconnect(&self, session: &Session) {
    if let Some(h) = &self.handlers.on_disconnect {
      h(session);
    }
  }

  pub(crate) fn message(&self, session: &Session, payload: Bytes) {
    if let Some(h) = &self.handlers.on_message {
      h(session, payload);
    }
  }

  pub(crate) fn message_binary(&self, session: &Session, payload: Bytes) {
    if let Some(h) = &self.handlers.on_message_binary {
      h(session, payload);
    }
  }

  pub(crate) fn message_sent(&self, session: &Session, payload: Bytes) {
    if let Some(h) = &self.handlers.on_message_sent {
      h(session, payload);
    }
  }

  pub(crate) fn message_sent_binary(&self, session: &Session, payload: Bytes) {
    if let Some(h) = &self.handlers.on_message_sent_binary {
      h(session, payload);
    }
  }

  pub(crate) fn pong(&self, session: &Session) {
    if let Some(h) = &self.handlers.on_pong {
      h(session);
    }
  }

  pub(crate) fn close_request(&self, session: &Session, payload: Bytes) {
    if let Some(h) = &self.handlers.on_close_request {
      h(session, payload);
    }
  }
}
