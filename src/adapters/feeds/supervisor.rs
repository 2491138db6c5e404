//! Connection Supervisor - Per-exchange Feed Lifecycle
//!
//! One supervisor per exchange, running for the process lifetime once
//! started. It walks a fixed state machine:
//!
//! `Disconnected → Connecting → Connected → receive-loop → (error) →
//! Backoff → Connecting → …`
//!
//! The receive loop is the sole suspension point; decoding, the cache
//! write and fan-out all run synchronously on it. Any transport or decode
//! failure closes the socket best-effort and cycles through backoff —
//! retries are unbounded. Shutdown arrives on a broadcast channel and
//! interrupts both a blocked receive and a backoff sleep.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::adapters::metrics::FeedMetrics;
use crate::domain::tick::Exchange;
use crate::ports::connector::ExchangeConnector;
use crate::usecases::publisher::Publisher;
use crate::usecases::subscriptions::SubscriptionRegistry;

/// Lifecycle state of one exchange connection.
///
/// Owned exclusively by that exchange's supervisor loop; everyone else
/// observes it through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Backoff,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervises the WebSocket connection for a single exchange.
pub struct ConnectionSupervisor {
    connector: Arc<dyn ExchangeConnector>,
    subscriptions: Arc<SubscriptionRegistry>,
    publisher: Arc<Publisher>,
    reconnect: ReconnectConfig,
    metrics: Arc<FeedMetrics>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionSupervisor {
    pub fn new(
        connector: Arc<dyn ExchangeConnector>,
        subscriptions: Arc<SubscriptionRegistry>,
        publisher: Arc<Publisher>,
        reconnect: ReconnectConfig,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            subscriptions,
            publisher,
            reconnect,
            metrics,
            state_tx,
        }
    }

    /// Exchange this supervisor is responsible for.
    pub fn exchange(&self) -> Exchange {
        self.connector.exchange()
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Run the connect/stream/backoff loop until shutdown.
    #[instrument(skip_all, fields(exchange = %self.connector.exchange()))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let exchange = self.connector.exchange();
        let mut policy = ReconnectPolicy::new(self.reconnect.clone());

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.connect_and_stream(&mut policy, &mut shutdown_rx).await {
                Ok(()) => {
                    self.set_state(ConnectionState::Disconnected);
                    info!("feed shut down gracefully");
                    return Ok(());
                }
                Err(e) => {
                    self.set_state(ConnectionState::Backoff);
                    self.metrics
                        .reconnects
                        .with_label_values(&[exchange.as_str()])
                        .inc();

                    let delay = policy.next_delay();
                    warn!(
                        error = %e,
                        attempt = policy.attempts(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "feed disconnected, backing off"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            self.set_state(ConnectionState::Disconnected);
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Single connection session: connect, subscribe, stream until error
    /// or shutdown. Returns `Ok` only on shutdown.
    async fn connect_and_stream(
        &self,
        policy: &mut ReconnectPolicy,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        let exchange = self.connector.exchange();
        let symbols = self.subscription_snapshot();
        let url = self.connector.endpoint(&symbols);

        let (ws_stream, _) = connect_async(&url)
            .await
            .with_context(|| format!("{exchange} WebSocket connection failed"))?;
        let (mut write, mut read) = ws_stream.split();

        if let Some(frame) = self.connector.subscribe_message(&symbols) {
            write
                .send(Message::Text(frame))
                .await
                .with_context(|| format!("{exchange} subscribe frame failed"))?;
        }

        self.set_state(ConnectionState::Connected);
        policy.reset();
        info!(symbols = symbols.len(), "feed connected");

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match self.connector.decode(text.as_ref()) {
                                Ok(ticks) => {
                                    for tick in ticks {
                                        self.metrics
                                            .ticks_decoded
                                            .with_label_values(&[exchange.as_str()])
                                            .inc();
                                        self.publisher.publish(tick);
                                    }
                                }
                                // Malformed envelopes may mean protocol drift;
                                // cycle the connection rather than skip.
                                Err(e) => break Err(anyhow!(e)),
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            // Pong is handled automatically by tungstenite
                            debug!(len = payload.len(), "ping received");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break Err(anyhow!("connection closed by server: {frame:?}"));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Err(anyhow!("WebSocket error: {e}")),
                        None => break Err(anyhow!("WebSocket stream ended")),
                    }
                }
            }
        };

        // Best-effort close on both paths; secondary errors are logged only.
        if let Err(close_err) = write.close().await {
            debug!(error = %close_err, "error closing socket");
        }

        result
    }

    fn subscription_snapshot(&self) -> Vec<String> {
        let snapshot = self.subscriptions.snapshot(self.connector.exchange());
        if snapshot.is_empty() {
            self.connector
                .fallback_symbols()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        } else {
            snapshot
        }
    }

    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_replace(next);
        self.metrics
            .connected
            .with_label_values(&[self.connector.exchange().as_str()])
            .set(i64::from(next == ConnectionState::Connected));
    }
}
