// tests/heartbeat.rs

use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether::{mock_transport_pair, Config, Envelope, MessageKind, Metadata, Transport};
mod common;

const LONG_TIMEOUT: Duration = Duration::from_secs(2);

// --- Test: the write pump probes the peer on its own timer ---
#[tokio::test]
async fn test_heartbeat_pings_are_emitted() {
  println!("Starting test_heartbeat_pings_are_emitted...");
  let errors = common::ErrorLog::new();
  let (probe, mut sessions) = common::session_probe();

  // Long pong_wait keeps the idle deadline out of this test's way.
  let config = Config {
    ping_period: Duration::from_millis(100),
    pong_wait: Duration::from_secs(10),
    ..common::fast_config()
  };
  let hub = Arc::new(
    common::test_hub_builder(config)
      .on_error(errors.handler())
      .on_connect(probe)
      .build()
      .expect("config must build"),
  );

  let (local, peer) = mock_transport_pair(16);
  let runner = {
    let hub = hub.clone();
    tokio::spawn(async move { hub.run_session(local, Metadata::new()).await })
  };
  let session = common::expect_session(&mut sessions).await;

  let ping = common::expect_kind(&peer, MessageKind::Ping, LONG_TIMEOUT).await;
  assert!(ping.payload().is_empty(), "heartbeat pings carry no payload");
  let _ = common::expect_kind(&peer, MessageKind::Ping, LONG_TIMEOUT).await;
  println!("Two heartbeat pings observed.");

  assert!(!session.is_closed());
  assert_eq!(errors.count(), 0, "got {:?}", errors.entries());

  session.close().expect("close");
  runner
    .await
    .expect("runner panicked")
    .expect("run_session failed");
  println!("Test test_heartbeat_pings_are_emitted finished.");
}

// --- Test: a peer that never answers pings gets expired ---
#[tokio::test]
async fn test_silent_peer_expires_the_session() {
  println!("Starting test_silent_peer_expires_the_session...");
  let journal: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
  let (probe, mut sessions) = common::session_probe();

  let hub = Arc::new(
    common::test_hub_builder(common::fast_config())
      .on_connect(probe)
      .on_error({
        let journal = journal.clone();
        move |_session, err| journal.lock().unwrap().push(format!("error: {}", err))
      })
      .on_disconnect({
        let journal = journal.clone();
        move |_session| journal.lock().unwrap().push("disconnect".into())
      })
      .build()
      .expect("config must build"),
  );

  // The peer side exists but never reads or writes anything.
  let (local, _peer) = mock_transport_pair(16);
  let runner = {
    let hub = hub.clone();
    tokio::spawn(async move { hub.run_session(local, Metadata::new()).await })
  };
  let session = common::expect_session(&mut sessions).await;

  common::wait_until(|| session.is_closed(), LONG_TIMEOUT)
    .await
    .expect("idle deadline expires the session");
  runner
    .await
    .expect("runner panicked")
    .expect("run_session failed");

  let entries = journal.lock().unwrap().clone();
  assert_eq!(entries.len(), 2, "one expiry report then one disconnect, got {:?}", entries);
  assert!(entries[0].contains("no pong"), "got {:?}", entries);
  assert_eq!(entries[1], "disconnect");
  println!("Test test_silent_peer_expires_the_session finished.");
}

// --- Test: pong replies renew the idle deadline ---
#[tokio::test]
async fn test_pong_renews_the_idle_deadline() {
  println!("Starting test_pong_renews_the_idle_deadline...");
  let errors = common::ErrorLog::new();
  let (probe, mut sessions) = common::session_probe();
  let pongs_seen = Arc::new(AtomicUsize::new(0));

  let hub = Arc::new(
    common::test_hub_builder(common::fast_config())
      .on_error(errors.handler())
      .on_connect(probe)
      .on_pong({
        let pongs_seen = pongs_seen.clone();
        move |_session| {
          pongs_seen.fetch_add(1, Ordering::Relaxed);
        }
      })
      .build()
      .expect("config must build"),
  );

  let (local, peer) = mock_transport_pair(16);
  let responder = tokio::spawn(common::answer_pings(peer));
  let runner = {
    let hub = hub.clone();
    tokio::spawn(async move { hub.run_session(local, Metadata::new()).await })
  };
  let session = common::expect_session(&mut sessions).await;

  // Four times the idle window; without renewal the session would be long gone.
  tokio::time::sleep(common::fast_config().pong_wait * 4).await;

  assert!(!session.is_closed(), "pongs must keep the session alive");
  assert!(pongs_seen.load(Ordering::Relaxed) >= 1, "pong handler fires");
  assert_eq!(errors.count(), 0, "got {:?}", errors.entries());

  session.close().expect("close");
  runner
    .await
    .expect("runner panicked")
    .expect("run_session failed");
  responder.await.expect("responder panicked");
  println!("Test test_pong_renews_the_idle_deadline finished.");
}

// --- Test: the session answers an inbound ping without waking any handler ---
#[tokio::test]
async fn test_inbound_ping_is_answered_with_a_pong() {
  println!("Starting test_inbound_ping_is_answered_with_a_pong...");
  let errors = common::ErrorLog::new();
  let (probe, mut sessions) = common::session_probe();

  // Quiet timers: the only control traffic in this test is ours.
  let config = Config {
    ping_period: Duration::from_secs(30),
    pong_wait: Duration::from_secs(60),
    ..Config::default()
  };
  let hub = Arc::new(
    common::test_hub_builder(config)
      .on_error(errors.handler())
      .on_connect(probe)
      .build()
      .expect("config must build"),
  );

  let (local, peer) = mock_transport_pair(16);
  let runner = {
    let hub = hub.clone();
    tokio::spawn(async move { hub.run_session(local, Metadata::new()).await })
  };
  let session = common::expect_session(&mut sessions).await;

  peer
    .write_message(Envelope::new(MessageKind::Ping, Bytes::from_static(b"token")))
    .await
    .expect("peer ping");

  let pong = common::expect_kind(&peer, MessageKind::Pong, LONG_TIMEOUT).await;
  assert_eq!(pong.payload().as_ref(), b"token", "pong echoes the ping payload");
  assert_eq!(errors.count(), 0);

  session.close().expect("close");
  runner
    .await
    .expect("runner panicked")
    .expect("run_session failed");
  println!("Test test_inbound_ping_is_answered_with_a_pong finished.");
}
