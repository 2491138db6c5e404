//! Latest-price cache with fixed TTL and lazy expiry.
//!
//! Holds the most recent tick per `(exchange, symbol)` key. Entries are
//! overwritten on every accepted tick and treated as absent once their
//! deadline passes; no background sweep is required for correctness.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::tick::{normalize_symbol, Exchange, PriceTick};

/// A cached tick and the instant it stops being served.
#[derive(Debug, Clone)]
struct CacheEntry {
    tick: PriceTick,
    expires_at: Instant,
}

/// Keyed store of the latest tick per `(exchange, symbol)`.
///
/// Writes come from at most one supervisor task per key; reads come from
/// anywhere. Stale entries are invisible to readers even while still
/// physically present (lazy expiry).
pub struct PriceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PriceCache {
    /// Create a cache whose entries live for `ttl` after each write.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Configured time-to-live.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the entry for the tick's key with a fresh deadline.
    pub fn insert(&self, tick: PriceTick) {
        let entry = CacheEntry {
            expires_at: Instant::now() + self.ttl,
            tick,
        };
        self.entries.write().insert(entry.tick.cache_key(), entry);
    }

    /// Latest unexpired tick for `(exchange, symbol)`, if any.
    ///
    /// The symbol is normalized before lookup.
    pub fn get(&self, exchange: Exchange, symbol: &str) -> Option<PriceTick> {
        let key = PriceTick::key(exchange, &normalize_symbol(symbol));
        let entries = self.entries.read();
        let entry = entries.get(&key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.tick.clone())
        } else {
            None
        }
    }

    /// Number of physically present entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop expired entries; returns how many were removed.
    ///
    /// Optional maintenance only. Readers already ignore stale entries.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| now < e.expires_at);
        before - entries.len()
    }
}
