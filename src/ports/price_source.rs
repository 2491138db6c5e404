//! Price Source Port - Lookup Surface for the Rest of the Application
//!
//! REST handlers, portfolio bookkeeping and the like only ever read the
//! latest cached price through this interface. They learn nothing about
//! sockets, adapters or supervision.

use async_trait::async_trait;

use crate::domain::tick::{Exchange, PriceTick};

/// Read-only access to the latest known price per (exchange, symbol).
#[async_trait]
pub trait PriceSource: Send + Sync + 'static {
    /// Latest unexpired tick, or `None` when the price is stale or unknown.
    ///
    /// Callers treat `None` as "price temporarily unavailable", never as a
    /// fatal condition.
    async fn latest(&self, exchange: Exchange, symbol: &str) -> Option<PriceTick>;

    /// Whether at least one upstream feed is currently connected.
    async fn is_healthy(&self) -> bool;
}
