// src/mailbox.rs

//! The per-session outbound queue.
//!
//! A bounded MPMC channel carrying [`Envelope`](crate::Envelope)s from
//! producer calls to the outbound pump. `async-channel` gives the two
//! properties the close transition depends on: `close()` makes every
//! subsequent `try_send` fail with a `Closed` error (never a panic), and the
//! receiver may still drain envelopes accepted before the close.

use crate::envelope::Envelope;

/// Producer side, held by the session.
pub(crate) type MailboxSender = async_channel::Sender<Envelope>;
/// Consumer side, owned by the outbound pump.
pub(crate) type MailboxReceiver = async_channel::Receiver<Envelope>;

/// Creates the bounded envelope mailbox for one session.
pub(crate) fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
  // A zero capacity would make the channel a rendezvous; producers must never
  // block, so clamp to at least one slot.
  async_channel::bounded(capacity.max(1))
}
