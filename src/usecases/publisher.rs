//! Fan-out Publisher - Cache Write plus Subscriber Delivery
//!
//! Every accepted tick takes the same path: cache write first, then the
//! shared broadcast channel, then each registered sink in registration
//! order. Sink failures are logged and isolated — they never affect the
//! cache write, later sinks, or the supervisor's receive loop. Delivery
//! is at-most-once with no replay and no backpressure: lagging broadcast
//! receivers drop ticks, failed sinks simply miss them.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::metrics::FeedMetrics;
use crate::domain::cache::PriceCache;
use crate::domain::tick::PriceTick;
use crate::ports::sink::{SubscriberId, TickSink};

/// Fans normalized ticks out to the cache, the broadcast channel and all
/// registered sinks.
pub struct Publisher {
    cache: Arc<PriceCache>,
    update_tx: broadcast::Sender<PriceTick>,
    sinks: RwLock<Vec<(SubscriberId, Arc<dyn TickSink>)>>,
    metrics: Arc<FeedMetrics>,
}

impl Publisher {
    pub fn new(
        cache: Arc<PriceCache>,
        channel_capacity: usize,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(channel_capacity);
        Self {
            cache,
            update_tx,
            sinks: RwLock::new(Vec::new()),
            metrics,
        }
    }

    /// Receiver on the shared update channel carrying every accepted tick
    /// across all exchanges.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<PriceTick> {
        self.update_tx.subscribe()
    }

    /// Register a push sink; the returned handle allows removal.
    pub fn add_sink(&self, sink: Arc<dyn TickSink>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.sinks.write().push((id, sink));
        id
    }

    /// Remove a previously registered sink.
    ///
    /// Returns `true` when the handle was known.
    pub fn remove_sink(&self, id: SubscriberId) -> bool {
        let mut sinks = self.sinks.write();
        let before = sinks.len();
        sinks.retain(|(sid, _)| *sid != id);
        sinks.len() < before
    }

    /// Number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Deliver one tick to the cache and every consumer.
    pub fn publish(&self, tick: PriceTick) {
        self.cache.insert(tick.clone());
        self.metrics.ticks_published.inc();

        // No receivers is fine; the send result is informational only.
        let _ = self.update_tx.send(tick.clone());

        // Snapshot under the read lock, deliver outside it.
        let sinks: Vec<(SubscriberId, Arc<dyn TickSink>)> =
            self.sinks.read().clone();
        for (id, sink) in &sinks {
            if let Err(e) = sink.on_tick(&tick) {
                self.metrics.sink_failures.inc();
                warn!(
                    subscriber = %id,
                    exchange = %tick.exchange,
                    symbol = %tick.symbol,
                    error = %e,
                    "tick sink failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::tick::Exchange;

    struct CountingSink {
        delivered: AtomicUsize,
    }

    impl TickSink for CountingSink {
        fn on_tick(&self, _tick: &PriceTick) -> anyhow::Result<()> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSink;

    impl TickSink for FailingSink {
        fn on_tick(&self, _tick: &PriceTick) -> anyhow::Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    fn publisher() -> Publisher {
        let cache = Arc::new(PriceCache::new(Duration::from_secs(60)));
        let metrics = Arc::new(FeedMetrics::new().unwrap());
        Publisher::new(cache, 16, metrics)
    }

    fn tick() -> PriceTick {
        PriceTick {
            exchange: Exchange::Bybit,
            symbol: "BTCUSDT".to_string(),
            price: dec!(50000.1),
            volume: dec!(0.5),
            timestamp_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn failing_sink_does_not_block_later_sinks_or_the_cache() {
        let publisher = publisher();
        let counter = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
        });
        publisher.add_sink(Arc::new(FailingSink));
        publisher.add_sink(Arc::clone(&counter) as Arc<dyn TickSink>);

        publisher.publish(tick());

        assert_eq!(counter.delivered.load(Ordering::SeqCst), 1);
        assert!(publisher
            .cache
            .get(Exchange::Bybit, "BTCUSDT")
            .is_some());
        assert_eq!(publisher.metrics.sink_failures.get(), 1);
    }

    #[test]
    fn removed_sink_no_longer_receives_ticks() {
        let publisher = publisher();
        let counter = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
        });
        let id = publisher.add_sink(Arc::clone(&counter) as Arc<dyn TickSink>);

        publisher.publish(tick());
        assert!(publisher.remove_sink(id));
        assert!(!publisher.remove_sink(id));
        publisher.publish(tick());

        assert_eq!(counter.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.sink_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_channel_carries_every_accepted_tick() {
        let publisher = publisher();
        let mut rx = publisher.subscribe_updates();

        publisher.publish(tick());

        let received = rx.try_recv().unwrap();
        assert_eq!(received.symbol, "BTCUSDT");
        assert_eq!(received.price, dec!(50000.1));
    }
}
