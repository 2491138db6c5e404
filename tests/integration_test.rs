//! Integration Tests - End-to-end Feed Pipeline Testing
//!
//! Drives the feed manager against an in-process WebSocket server:
//! connect, subscribe, stream, forced disconnect, reconnect, shutdown.
//! Uses mockall for sink mocking and tokio::test for async tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use mockall::mock;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use market_feed_hub::adapters::exchanges::bybit;
use market_feed_hub::adapters::feeds::ConnectionState;
use market_feed_hub::config::FeedConfig;
use market_feed_hub::domain::tick::{Exchange, PriceTick};
use market_feed_hub::ports::connector::{DecodeError, ExchangeConnector};
use market_feed_hub::ports::sink::TickSink;
use market_feed_hub::usecases::FeedManager;

// ---- Mock Definitions ----

mock! {
    pub Sink {}

    impl TickSink for Sink {
        fn on_tick(&self, tick: &PriceTick) -> anyhow::Result<()>;
    }
}

// ---- Test Doubles ----

/// Connector that dials the in-process server but speaks the real Bybit
/// wire protocol, so the whole decode path is exercised.
struct LoopbackConnector {
    url: String,
    exchange: Exchange,
}

impl LoopbackConnector {
    fn new(addr: SocketAddr) -> Self {
        Self::with_exchange(Exchange::Bybit, addr)
    }

    fn with_exchange(exchange: Exchange, addr: SocketAddr) -> Self {
        Self {
            url: format!("ws://{addr}"),
            exchange,
        }
    }
}

impl ExchangeConnector for LoopbackConnector {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn endpoint(&self, _symbols: &[String]) -> String {
        self.url.clone()
    }

    fn subscribe_message(&self, symbols: &[String]) -> Option<String> {
        Some(format!("subscribe:{}", symbols.join(",")))
    }

    fn decode(&self, payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
        bybit::decode(payload)
    }

    fn fallback_symbols(&self) -> &[&'static str] {
        &["BTCUSDT"]
    }
}

fn fast_feed_config() -> FeedConfig {
    FeedConfig {
        reconnect_initial_delay_ms: 100,
        reconnect_max_delay_ms: 100,
        shutdown_grace_secs: 2,
        ..Default::default()
    }
}

async fn wait_for_state(
    manager: &FeedManager,
    exchange: Exchange,
    wanted: ConnectionState,
) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while manager.connection_state(exchange) != Some(wanted) {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {wanted:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---- Integration Tests ----

/// One tick per session; the server drops the connection after sending,
/// forcing the supervisor through Backoff and back to Connected.
#[tokio::test]
async fn test_feed_recovers_from_disconnect_and_serves_ticks() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (session_tx, mut session_rx) = mpsc::unbounded_channel::<usize>();

    tokio::spawn(async move {
        let mut session = 0usize;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            session += 1;
            let _ = session_tx.send(session);
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            // Consume the subscribe frame, then serve one trade and drop
            // the connection mid-stream.
            let _ = ws.next().await;
            let frame = format!(
                r#"{{"topic":"publicTrade.BTCUSDT","data":[{{"T":170000000000{session},"s":"BTCUSDT","v":"0.5","p":"5000{session}.0"}}]}}"#
            );
            let _ = ws.send(Message::Text(frame)).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let manager = FeedManager::new(
        vec![Arc::new(LoopbackConnector::new(addr))],
        &fast_feed_config(),
    )
    .unwrap();
    manager.subscribe(Exchange::Bybit, "btcusdt");

    // A failing sink must not disturb delivery to anything else.
    let mut failing_sink = MockSink::new();
    failing_sink
        .expect_on_tick()
        .returning(|_| anyhow::bail!("sink unavailable"));
    manager.add_subscriber(Arc::new(failing_sink));

    let mut updates = manager.updates();
    manager.start();

    let first = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("timed out waiting for first tick")
        .unwrap();
    assert_eq!(first.exchange, Exchange::Bybit);
    assert_eq!(first.symbol, "BTCUSDT");
    assert!(manager.latest_price(Exchange::Bybit, "BTCUSDT").is_some());

    // The server dropped the first connection; a second tick proves the
    // supervisor went through Backoff and reconnected on its own.
    let second = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("no tick after reconnect")
        .unwrap();
    assert_eq!(second.symbol, "BTCUSDT");

    let mut sessions = 0;
    while let Ok(s) = session_rx.try_recv() {
        sessions = s;
    }
    assert!(sessions >= 2, "expected a reconnect, saw {sessions} session(s)");

    manager.stop().await;
}

/// Shutdown must interrupt a receive that is blocked on a silent server
/// and join all tasks within the grace period.
#[tokio::test]
async fn test_shutdown_interrupts_blocked_receive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await
                else {
                    return;
                };
                let _ = ws.next().await;
                // Hold the connection open without sending anything.
                tokio::time::sleep(Duration::from_secs(600)).await;
            });
        }
    });

    let manager = FeedManager::new(
        vec![Arc::new(LoopbackConnector::new(addr))],
        &fast_feed_config(),
    )
    .unwrap();
    manager.start();
    wait_for_state(&manager, Exchange::Bybit, ConnectionState::Connected).await;

    let started = Instant::now();
    manager.stop().await;
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "stop exceeded the grace period"
    );
    assert_eq!(
        manager.connection_state(Exchange::Bybit),
        Some(ConnectionState::Disconnected)
    );

    // Idempotent: stopping again is a no-op.
    manager.stop().await;
}

/// With nothing listening, the supervisor cycles Connecting/Backoff
/// forever without crashing, and stop works from that state.
#[tokio::test]
async fn test_unreachable_endpoint_keeps_retrying_until_stopped() {
    // Bind then drop to get a port with no listener.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let manager = FeedManager::new(
        vec![Arc::new(LoopbackConnector::new(addr))],
        &fast_feed_config(),
    )
    .unwrap();
    manager.start();
    wait_for_state(&manager, Exchange::Bybit, ConnectionState::Backoff).await;

    assert!(!manager.is_healthy());
    assert!(manager.latest_price(Exchange::Bybit, "BTCUSDT").is_none());

    manager.stop().await;
    assert_eq!(
        manager.connection_state(Exchange::Bybit),
        Some(ConnectionState::Disconnected)
    );
}

/// A dead exchange cycling through Backoff must not starve a healthy
/// one sharing the same runtime.
#[tokio::test]
async fn test_one_dead_feed_does_not_starve_another() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await
                else {
                    return;
                };
                let _ = ws.next().await;
                let frame = r#"{"topic":"publicTrade.BTCUSDT","data":[{"T":1700000000001,"s":"BTCUSDT","v":"0.5","p":"50000.1"}]}"#;
                let _ = ws.send(Message::Text(frame.to_string())).await;
                tokio::time::sleep(Duration::from_secs(600)).await;
            });
        }
    });

    // A port with nothing listening for the second exchange.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let manager = FeedManager::new(
        vec![
            Arc::new(LoopbackConnector::new(addr)),
            Arc::new(LoopbackConnector::with_exchange(Exchange::Kraken, dead_addr)),
        ],
        &fast_feed_config(),
    )
    .unwrap();
    let mut updates = manager.updates();
    manager.start();

    let tick = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("healthy feed starved by the dead one")
        .unwrap();
    assert_eq!(tick.exchange, Exchange::Bybit);

    wait_for_state(&manager, Exchange::Kraken, ConnectionState::Backoff).await;
    assert!(manager.is_healthy());
    assert!(!manager.is_fully_healthy());

    manager.stop().await;
}

/// Subscriber management through the manager facade.
#[tokio::test]
async fn test_add_and_remove_subscriber() {
    let manager = FeedManager::new(
        vec![Arc::new(LoopbackConnector::new(
            "127.0.0.1:9".parse().unwrap(),
        ))],
        &fast_feed_config(),
    )
    .unwrap();

    let mut sink = MockSink::new();
    sink.expect_on_tick().never();
    let id = manager.add_subscriber(Arc::new(sink));
    assert!(manager.remove_subscriber(id));
    assert!(!manager.remove_subscriber(id));
}

/// Duplicate connectors for one exchange are rejected outright.
#[tokio::test]
async fn test_duplicate_exchange_connectors_are_rejected() {
    let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let result = FeedManager::new(
        vec![
            Arc::new(LoopbackConnector::new(addr)),
            Arc::new(LoopbackConnector::new(addr)),
        ],
        &fast_feed_config(),
    );
    assert!(result.is_err());
}
