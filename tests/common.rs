// tests/common.rs
#![allow(dead_code)] // Allow unused helpers for now

use tether::{Config, Envelope, Hub, HubBuilder, MessageKind, MockTransport, Session, TetherError, Transport};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(500);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(5);

// Use std::sync::Once for one-time initialization
static TRACING_INIT: Once = Once::new();

// Setup function to initialize tracing
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    // Default level filter (e.g., trace for tether, warn for others)
    // Can be overridden by RUST_LOG env variable
    let default_filter = "tether=trace,debug,info,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_max_level(tracing::Level::TRACE) // Allow all levels down to TRACE
      .with_env_filter(env_filter)
      .with_target(true) // Show module path
      .with_line_number(true) // Show line numbers
      .with_span_events(FmtSpan::CLOSE) // Log when spans close
      .with_test_writer() // Write to test output capture
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

// Helper to start a hub builder with tracing initialized
pub fn test_hub_builder(config: Config) -> HubBuilder {
  setup_tracing();
  Hub::builder().config(config)
}

/// Config with timers tight enough that heartbeat behavior is observable
/// within a test run.
pub fn fast_config() -> Config {
  Config {
    write_wait: Duration::from_secs(1),
    pong_wait: Duration::from_millis(300),
    ping_period: Duration::from_millis(100),
    max_message_size: 512,
    message_buffer_size: 16,
  }
}

/// Collects error handler invocations as display strings, so tests can assert
/// on counts and message substrings.
#[derive(Clone, Default)]
pub struct ErrorLog {
  entries: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Handler closure to install via `HubBuilder::on_error`.
  pub fn handler(&self) -> impl Fn(&Session, &TetherError) + Send + Sync + 'static {
    let entries = self.entries.clone();
    move |_session, err| entries.lock().unwrap().push(err.to_string())
  }

  pub fn entries(&self) -> Vec<String> {
    self.entries.lock().unwrap().clone()
  }

  pub fn count(&self) -> usize {
    self.entries.lock().unwrap().len()
  }

  pub fn contains(&self, needle: &str) -> bool {
    self.entries.lock().unwrap().iter().any(|entry| entry.contains(needle))
  }
}

/// Channel-backed `on_connect` hook handing the test its session handle.
pub fn session_probe() -> (
  impl Fn(&Session) + Send + Sync + 'static,
  mpsc::UnboundedReceiver<Session>,
) {
  let (tx, rx) = mpsc::unbounded_channel();
  let hook = move |session: &Session| {
    let _ = tx.send(session.clone());
  };
  (hook, rx)
}

pub async fn expect_session(rx: &mut mpsc::UnboundedReceiver<Session>) -> Session {
  timeout(LONG_TIMEOUT, rx.recv())
    .await
    .expect("no session handed out within timeout")
    .expect("session channel closed unexpectedly")
}

// Helper for peer-side recv with timeout assertion
pub async fn expect_envelope(peer: &impl Transport, within: Duration) -> Envelope {
  match timeout(within, peer.read_message()).await {
    Ok(Ok(envelope)) => envelope,
    Ok(Err(e)) => panic!("peer read failed: {}", e),
    Err(_) => panic!("no envelope within {:?}", within),
  }
}

/// Reads envelopes until one of the wanted kind arrives, skipping the rest
/// (heartbeat pings interleave with data on a live session).
pub async fn expect_kind(peer: &impl Transport, kind: MessageKind, within: Duration) -> Envelope {
  let deadline = tokio::time::Instant::now() + within;
  loop {
    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if remaining.is_zero() {
      panic!("no {:?} envelope within {:?}", kind, within);
    }
    let envelope = expect_envelope(peer, remaining).await;
    if envelope.kind() == kind {
      return envelope;
    }
  }
}

// --- Helper function to poll for a condition ---
pub async fn wait_until(check: impl Fn() -> bool, within: Duration) -> Result<(), String> {
  let start = tokio::time::Instant::now();
  loop {
    if check() {
      return Ok(());
    }
    if start.elapsed() > within {
      return Err(format!("condition not met within {:?}", within));
    }
    sleep(Duration::from_millis(10)).await;
  }
}

/// Peer task that answers every ping with a pong, keeping the session's idle
/// deadline renewed. Returns when the peer side reads an error or a close.
pub async fn answer_pings(peer: MockTransport) {
  loop {
    match peer.read_message().await {
      Ok(envelope) => match envelope.kind() {
        MessageKind::Ping => {
          if peer.write_message(Envelope::pong(envelope.into_payload())).await.is_err() {
            return;
          }
        }
        MessageKind::Close => return,
        _ => {}
      },
      Err(_) => return,
    }
  }
}
