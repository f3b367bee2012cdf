// src/pump.rs

//! The two per-session I/O loops.
//!
//! Each session runs exactly one of each: the write pump owns the transport's
//! write direction and the mailbox receiver, the read pump owns the read
//! direction. Neither loop holds a lock across an await; they meet only at
//! the close transition, which either may invoke when its loop exits.

use crate::envelope::{Envelope, MessageKind};
use crate::error::TetherError;
use crate::mailbox::MailboxReceiver;
use crate::session::Session;

use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Sole writer: drains the mailbox, interleaves heartbeat pings, terminates
/// on write failure or after writing a close message, then drives the close
/// transition.
pub(crate) async fn write_pump(session: Session, mailbox: MailboxReceiver) {
  let ping_period = session.shared().config.ping_period;
  // First tick one full period out; a ping at t=0 probes nothing.
  let mut heartbeat = interval_at(Instant::now() + ping_period, ping_period);
  heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

  tracing::debug!(session = session.handle(), "write pump started");

  loop {
    tokio::select! {
      received = mailbox.recv() => {
        let envelope = match received {
          Ok(envelope) => envelope,
          // Mailbox closed and fully drained: the normal shutdown path.
          Err(_) => break,
        };
        let kind = envelope.kind();
        let payload = envelope.payload().clone();
        tracing::trace!(session = session.handle(), ?kind, size = payload.len(), "writing envelope");

        if let Err(err) = session.write_raw(envelope).await {
          // Only the transition winner reports; a write failing after the
          // close is the teardown discarding the queue, not a new fault.
          session.report_terminal(err);
          break;
        }
        match kind {
          MessageKind::Close => break,
          MessageKind::Text => session.shared().message_sent(&session, payload),
          MessageKind::Binary => session.shared().message_sent_binary(&session, payload),
          // Control traffic has no sent hook.
          MessageKind::Ping | MessageKind::Pong => {}
        }
      }
      _ = heartbeat.tick() => {
        tracing::trace!(session = session.handle(), "heartbeat ping");
        if let Err(err) = session.write_raw(Envelope::ping()).await {
          session.report_terminal(err);
          break;
        }
      }
    }
  }

  session.perform_close();
  tracing::debug!(session = session.handle(), "write pump stopped");
}

/// Sole reader: dispatches inbound messages to handlers and renews the idle
/// deadline on pongs. Exits on read failure, on idle expiry or when the peer
/// requests a close, then drives the close transition.
pub(crate) async fn read_pump(session: Session) {
  let pong_wait = session.shared().config.pong_wait;
  session
    .transport()
    .set_read_limit(session.shared().config.max_message_size);

  // Read-idle deadline. Only a pong renews it: inbound data alone must not
  // keep a connection alive whose peer stopped answering probes.
  let idle = sleep(pong_wait);
  tokio::pin!(idle);

  tracing::debug!(session = session.handle(), "read pump started");

  loop {
    tokio::select! {
      _ = idle.as_mut() => {
        session.report_terminal(TetherError::PongTimeout(pong_wait));
        break;
      }
      received = session.transport().read_message() => {
        let envelope = match received {
          Ok(envelope) => envelope,
          Err(err) => {
            // A read failing after the transition is our own teardown
            // yanking the transport; the loser of the race stays quiet.
            session.report_terminal(err);
            break;
          }
        };
        tracing::trace!(
          session = session.handle(),
          kind = ?envelope.kind(),
          size = envelope.size(),
          "envelope received"
        );
        match envelope.kind() {
          MessageKind::Text => session.shared().message(&session, envelope.into_payload()),
          MessageKind::Binary => session.shared().message_binary(&session, envelope.into_payload()),
          MessageKind::Pong => {
            idle.as_mut().reset(Instant::now() + pong_wait);
            session.shared().pong(&session);
          }
          MessageKind::Ping => {
            // Reply through the mailbox so the write pump stays the sole
            // writer. Best effort: under a full mailbox the reply is dropped
            // and the peer's next ping retries.
            if !session.try_enqueue_control(Envelope::pong(envelope.into_payload())) {
              tracing::trace!(session = session.handle(), "pong reply dropped");
            }
          }
          MessageKind::Close => {
            session.shared().close_request(&session, envelope.into_payload());
            break;
          }
        }
      }
    }
  }

  session.perform_close();
  tracing::debug!(session = session.handle(), "read pump stopped");
}
