// src/transport/tcp.rs

use crate::envelope::{Envelope, MessageKind};
use crate::error::TetherError;
use crate::transport::Transport;

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

// Frame layout: length prefix (codec) | kind byte | payload.
const KIND_TEXT: u8 = 0x1;
const KIND_BINARY: u8 = 0x2;
const KIND_CLOSE: u8 = 0x8;
const KIND_PING: u8 = 0x9;
const KIND_PONG: u8 = 0xA;

// Hard frame ceiling for the codec in both directions; the configured inbound
// limit is enforced per envelope after decode.
const DEFAULT_MAX_FRAME: usize = 8 * 1024 * 1024;

/// Message transport over a raw TCP stream.
///
/// Framing is delegated to a length-delimited codec; this adapter only maps
/// the leading kind byte to [`MessageKind`]. Read and write halves sit behind
/// independent async mutexes, uncontended in practice since each pump is the
/// sole caller of its direction. `close` cancels a token both directions
/// select against, so a blocked read or write unblocks immediately, and drops
/// the write half so the peer observes the shutdown without waiting for the
/// last reference to the transport to drop.
pub struct TcpTransport {
  reader: Mutex<FramedRead<OwnedReadHalf, LengthDelimitedCodec>>,
  // None once closed. Dropping the half shuts the socket's write direction
  // down at the OS level.
  writer: Mutex<Option<FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>>>,
  closed: CancellationToken,
  // 0 means no limit has been set yet.
  read_limit: AtomicUsize,
}

impl TcpTransport {
  pub fn new(stream: TcpStream) -> Self {
    if let Err(e) = stream.set_nodelay(true) {
      tracing::debug!(err = %e, "failed to set TCP_NODELAY");
    }
    let (read_half, write_half) = stream.into_split();
    let decoder = LengthDelimitedCodec::builder()
      .max_frame_length(DEFAULT_MAX_FRAME)
      .new_codec();
    let encoder = LengthDelimitedCodec::builder()
      .max_frame_length(DEFAULT_MAX_FRAME)
      .new_codec();
    Self {
      reader: Mutex::new(FramedRead::new(read_half, decoder)),
      writer: Mutex::new(Some(FramedWrite::new(write_half, encoder))),
      closed: CancellationToken::new(),
      read_limit: AtomicUsize::new(0),
    }
  }

  fn enforce_read_limit(&self, envelope: Envelope) -> Result<Envelope, TetherError> {
    let limit = self.read_limit.load(Ordering::Relaxed);
    if limit > 0 && envelope.size() > limit {
      return Err(TetherError::MessageTooLarge {
        size: envelope.size(),
        limit,
      });
    }
    Ok(envelope)
  }
}

#[async_trait]
impl Transport for TcpTransport {
  async fn read_message(&self) -> Result<Envelope, TetherError> {
    if self.closed.is_cancelled() {
      return Err(TetherError::ConnectionClosed);
    }
    let mut reader = self.reader.lock().await;
    tokio::select! {
      _ = self.closed.cancelled() => Err(TetherError::ConnectionClosed),
      frame = reader.next() => match frame {
        None => Err(TetherError::ConnectionClosed),
        Some(Err(e)) => Err(TetherError::from_io(e)),
        Some(Ok(frame)) => decode_frame(frame).and_then(|envelope| self.enforce_read_limit(envelope)),
      },
    }
  }

  async fn write_message(&self, envelope: Envelope) -> Result<(), TetherError> {
    if self.closed.is_cancelled() {
      return Err(TetherError::ConnectionClosed);
    }
    let mut writer = self.writer.lock().await;
    let sink = match writer.as_mut() {
      Some(sink) => sink,
      None => return Err(TetherError::ConnectionClosed),
    };
    let res = tokio::select! {
      _ = self.closed.cancelled() => Err(TetherError::ConnectionClosed),
      res = sink.send(encode_frame(envelope)) => res.map_err(TetherError::from_io),
    };
    if res.is_err() {
      // A failed or cancelled write leaves the stream mid-frame; drop the
      // half so the peer sees the shutdown.
      drop(writer.take());
    }
    res
  }

  fn set_read_limit(&self, limit: usize) {
    self.read_limit.store(limit, Ordering::Relaxed);
  }

  fn close(&self) {
    self.closed.cancel();
    // Dropping the write half sends the shutdown to the peer now rather than
    // at the last handle drop. A write in flight drops it on its own cancel
    // path instead.
    if let Ok(mut writer) = self.writer.try_lock() {
      drop(writer.take());
    }
  }
}

fn encode_frame(envelope: Envelope) -> Bytes {
  let mut buf = BytesMut::with_capacity(1 + envelope.size());
  buf.put_u8(kind_to_byte(envelope.kind()));
  buf.extend_from_slice(envelope.payload());
  buf.freeze()
}

fn decode_frame(mut frame: BytesMut) -> Result<Envelope, TetherError> {
  if frame.is_empty() {
    return Err(TetherError::Protocol("empty frame".into()));
  }
  let kind_byte = frame.get_u8();
  let kind = kind_from_byte(kind_byte)
    .ok_or_else(|| TetherError::Protocol(format!("unknown frame kind {:#04x}", kind_byte)))?;
  Ok(Envelope::new(kind, frame.freeze()))
}

fn kind_to_byte(kind: MessageKind) -> u8 {
  match kind {
    MessageKind::Text => KIND_TEXT,
    MessageKind::Binary => KIND_BINARY,
    MessageKind::Close => KIND_CLOSE,
    MessageKind::Ping => KIND_PING,
    MessageKind::Pong => KIND_PONG,
  }
}

fn kind_from_byte(byte: u8) -> Option<MessageKind> {
  match byte {
    KIND_TEXT => Some(MessageKind::Text),
    KIND_BINARY => Some(MessageKind::Binary),
    KIND_CLOSE => Some(MessageKind::Close),
    KIND_PING => Some(MessageKind::Ping),
    KIND_PONG => Some(MessageKind::Pong),
    _ => None,
  }
}
