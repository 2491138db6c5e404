//! Feed Manager - Ingestion Orchestrator
//!
//! The single entry point the rest of the application sees. Owns the
//! subscription registry, the price cache, the fan-out publisher and one
//! connection supervisor per enabled exchange; starts and stops them
//! together and answers latest-price and health queries.
//!
//! Nothing here is fatal to the hosting process: total failure of every
//! exchange degrades reads to "price temporarily unavailable" while the
//! supervisors keep retrying.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::exchanges::build_connectors;
use crate::adapters::feeds::{ConnectionState, ConnectionSupervisor, ReconnectConfig};
use crate::adapters::metrics::FeedMetrics;
use crate::config::{AppConfig, FeedConfig};
use crate::domain::cache::PriceCache;
use crate::domain::tick::{Exchange, PriceTick};
use crate::ports::connector::ExchangeConnector;
use crate::ports::price_source::PriceSource;
use crate::ports::sink::{SubscriberId, TickSink};
use crate::usecases::publisher::Publisher;
use crate::usecases::subscriptions::SubscriptionRegistry;

/// Orchestrates all feed supervisors and exposes the ingestion API.
pub struct FeedManager {
    subscriptions: Arc<SubscriptionRegistry>,
    cache: Arc<PriceCache>,
    publisher: Arc<Publisher>,
    metrics: Arc<FeedMetrics>,
    supervisors: Vec<Arc<ConnectionSupervisor>>,
    states: HashMap<Exchange, watch::Receiver<ConnectionState>>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_grace: Duration,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FeedManager {
    /// Build a manager over the given connectors.
    ///
    /// Exactly one supervisor is created per exchange; duplicate
    /// connectors for the same exchange are rejected.
    pub fn new(
        connectors: Vec<Arc<dyn ExchangeConnector>>,
        feed: &FeedConfig,
    ) -> Result<Self> {
        let metrics = Arc::new(FeedMetrics::new()?);
        let cache = Arc::new(PriceCache::new(Duration::from_secs(feed.cache_ttl_secs)));
        let publisher = Arc::new(Publisher::new(
            Arc::clone(&cache),
            feed.channel_capacity,
            Arc::clone(&metrics),
        ));
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let (shutdown_tx, _) = broadcast::channel(1);
        let reconnect = ReconnectConfig::from_feed_config(feed);

        let mut supervisors = Vec::with_capacity(connectors.len());
        let mut states = HashMap::new();
        for connector in connectors {
            let exchange = connector.exchange();
            anyhow::ensure!(
                !states.contains_key(&exchange),
                "duplicate connector for {exchange}"
            );
            let supervisor = Arc::new(ConnectionSupervisor::new(
                connector,
                Arc::clone(&subscriptions),
                Arc::clone(&publisher),
                reconnect.clone(),
                Arc::clone(&metrics),
            ));
            states.insert(exchange, supervisor.state());
            supervisors.push(supervisor);
        }

        Ok(Self {
            subscriptions,
            cache,
            publisher,
            metrics,
            supervisors,
            states,
            shutdown_tx,
            shutdown_grace: Duration::from_secs(feed.shutdown_grace_secs),
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Build a manager from the application config, one connector per
    /// enabled exchange, with startup symbols already subscribed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let connectors = build_connectors(&config.exchanges);
        anyhow::ensure!(!connectors.is_empty(), "no exchange feeds enabled");

        let manager = Self::new(connectors, &config.feed)?;
        for symbol in &config.exchanges.binance.symbols {
            manager.subscribe(Exchange::Binance, symbol);
        }
        for symbol in &config.exchanges.bybit.symbols {
            manager.subscribe(Exchange::Bybit, symbol);
        }
        for symbol in &config.exchanges.kraken.symbols {
            manager.subscribe(Exchange::Kraken, symbol);
        }
        Ok(manager)
    }

    /// Spawn every supervisor. No-op when already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("feed manager already running");
            return;
        }

        let mut handles = self.handles.lock();
        for supervisor in &self.supervisors {
            let supervisor = Arc::clone(supervisor);
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                let exchange = supervisor.exchange();
                match supervisor.run(shutdown_rx).await {
                    Ok(()) => info!(exchange = %exchange, "feed exited normally"),
                    Err(e) => error!(exchange = %exchange, error = %e, "feed crashed"),
                }
            }));
        }
        info!(feeds = self.supervisors.len(), "feed tasks spawned");
    }

    /// Stop every supervisor and join them within the grace period.
    ///
    /// Idempotent: calling on an already-stopped manager does nothing.
    /// Works without any live connection.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("feed manager already stopped");
            return;
        }

        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.shutdown_grace, handle)
                .await
                .is_err()
            {
                warn!("feed task did not stop within grace period, aborting");
                abort.abort();
            }
        }
        info!("feed manager stopped");
    }

    /// Add a symbol to an exchange's subscription set. Idempotent.
    ///
    /// Takes effect at the next (re)connect of that exchange's feed.
    pub fn subscribe(&self, exchange: Exchange, symbol: &str) -> bool {
        self.subscriptions.subscribe(exchange, symbol)
    }

    /// Remove a symbol from an exchange's subscription set.
    pub fn unsubscribe(&self, exchange: Exchange, symbol: &str) -> bool {
        self.subscriptions.unsubscribe(exchange, symbol)
    }

    /// Latest unexpired tick for `(exchange, symbol)`.
    pub fn latest_price(&self, exchange: Exchange, symbol: &str) -> Option<PriceTick> {
        self.cache.get(exchange, symbol)
    }

    /// Register a push subscriber for every accepted tick.
    pub fn add_subscriber(&self, sink: Arc<dyn TickSink>) -> SubscriberId {
        self.publisher.add_sink(sink)
    }

    /// Remove a previously registered subscriber.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.publisher.remove_sink(id)
    }

    /// Receiver on the shared update channel (all exchanges, one stream).
    pub fn updates(&self) -> broadcast::Receiver<PriceTick> {
        self.publisher.subscribe_updates()
    }

    /// Current connection state of one exchange's feed.
    pub fn connection_state(&self, exchange: Exchange) -> Option<ConnectionState> {
        self.states.get(&exchange).map(|rx| *rx.borrow())
    }

    /// At least one feed connected (degraded mode OK).
    pub fn is_healthy(&self) -> bool {
        self.states
            .values()
            .any(|rx| *rx.borrow() == ConnectionState::Connected)
    }

    /// All feeds connected (fully operational).
    pub fn is_fully_healthy(&self) -> bool {
        !self.states.is_empty()
            && self
                .states
                .values()
                .all(|rx| *rx.borrow() == ConnectionState::Connected)
    }

    /// Metrics registry backing the /metrics endpoint.
    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }
}

#[async_trait]
impl PriceSource for FeedManager {
    async fn latest(&self, exchange: Exchange, symbol: &str) -> Option<PriceTick> {
        self.latest_price(exchange, symbol)
    }

    async fn is_healthy(&self) -> bool {
        Self::is_healthy(self)
    }
}
