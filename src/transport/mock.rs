// src/transport/mock.rs

use crate::envelope::Envelope;
use crate::error::TetherError;
use crate::transport::Transport;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory transport endpoint, created in pairs by [`mock_transport_pair`].
///
/// Messages written to one endpoint are read from the other, unframed and in
/// order. Closing either endpoint releases blocked reads and writes on both
/// sides, which is exactly the disconnect behavior the session teardown
/// relies on, so tests can simulate a peer vanishing by closing (or dropping)
/// its endpoint.
pub struct MockTransport {
  tx: async_channel::Sender<Envelope>,
  rx: async_channel::Receiver<Envelope>,
  // 0 means no limit has been set yet.
  read_limit: AtomicUsize,
}

/// Builds two connected endpoints. `capacity` bounds each direction; a small
/// value lets tests stall the writing side on purpose.
pub fn mock_transport_pair(capacity: usize) -> (MockTransport, MockTransport) {
  let (a_tx, b_rx) = async_channel::bounded(capacity.max(1));
  let (b_tx, a_rx) = async_channel::bounded(capacity.max(1));
  (
    MockTransport {
      tx: a_tx,
      rx: a_rx,
      read_limit: AtomicUsize::new(0),
    },
    MockTransport {
      tx: b_tx,
      rx: b_rx,
      read_limit: AtomicUsize::new(0),
    },
  )
}

#[async_trait]
impl Transport for MockTransport {
  async fn read_message(&self) -> Result<Envelope, TetherError> {
    let envelope = self
      .rx
      .recv()
      .await
      .map_err(|_| TetherError::ConnectionClosed)?;

    let limit = self.read_limit.load(Ordering::Relaxed);
    if limit > 0 && envelope.size() > limit {
      return Err(TetherError::MessageTooLarge {
        size: envelope.size(),
        limit,
      });
    }
    Ok(envelope)
  }

  async fn write_message(&self, envelope: Envelope) -> Result<(), TetherError> {
    self
      .tx
      .send(envelope)
      .await
      .map_err(|_| TetherError::ConnectionClosed)
  }

  fn set_read_limit(&self, limit: usize) {
    self.read_limit.store(limit, Ordering::Relaxed);
  }

  fn close(&self) {
    self.tx.close();
    self.rx.close();
  }
}
