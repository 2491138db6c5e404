//! Prometheus Metrics Registry - Feed Observability
//!
//! Registers and renders the feed hub's Prometheus metrics. All metrics
//! follow the naming convention `feed_hub_*` and carry an exchange label
//! where the concern is per-feed.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tracing::error;

/// Centralized Prometheus metrics for the feed hub.
pub struct FeedMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Ticks decoded per exchange.
    pub ticks_decoded: IntCounterVec,
    /// Ticks accepted into the cache and fan-out, all exchanges.
    pub ticks_published: IntCounter,
    /// Subscriber sink deliveries that returned an error.
    pub sink_failures: IntCounter,
    /// Reconnection attempts per exchange.
    pub reconnects: IntCounterVec,
    /// Connection status per exchange (1 = connected, 0 = not).
    pub connected: IntGaugeVec,
}

impl FeedMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let ticks_decoded = IntCounterVec::new(
            Opts::new(
                "feed_hub_ticks_decoded_total",
                "Canonical ticks decoded from exchange frames",
            ),
            &["exchange"],
        )?;

        let ticks_published = IntCounter::new(
            "feed_hub_ticks_published_total",
            "Ticks written to the cache and fanned out",
        )?;

        let sink_failures = IntCounter::new(
            "feed_hub_sink_failures_total",
            "Subscriber sink deliveries that failed",
        )?;

        let reconnects = IntCounterVec::new(
            Opts::new(
                "feed_hub_reconnects_total",
                "Reconnection attempts after a feed failure",
            ),
            &["exchange"],
        )?;

        let connected = IntGaugeVec::new(
            Opts::new(
                "feed_hub_feed_connected",
                "Feed connection status (1=connected, 0=disconnected)",
            ),
            &["exchange"],
        )?;

        registry.register(Box::new(ticks_decoded.clone()))?;
        registry.register(Box::new(ticks_published.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            ticks_decoded,
            ticks_published,
            sink_failures,
            reconnects,
            connected,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            error!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
