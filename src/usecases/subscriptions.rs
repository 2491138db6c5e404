//! Subscription Registry - Symbols of Interest per Exchange
//!
//! Mutable at runtime by any caller; supervisors take sorted snapshots
//! when (re)building a connection. A mid-session change therefore takes
//! effect at the next reconnect, not on the live connection — carried
//! over as a documented limitation of the URL-path subscription style.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::domain::tick::{normalize_symbol, Exchange};

/// Per-exchange sets of case-normalized symbols.
#[derive(Default)]
pub struct SubscriptionRegistry {
    sets: RwLock<BTreeMap<Exchange, BTreeSet<String>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol to an exchange's set. Idempotent.
    ///
    /// Returns `true` when the symbol was not present before.
    pub fn subscribe(&self, exchange: Exchange, symbol: &str) -> bool {
        self.sets
            .write()
            .entry(exchange)
            .or_default()
            .insert(normalize_symbol(symbol))
    }

    /// Remove a symbol from an exchange's set.
    ///
    /// Returns `true` when the symbol was present.
    pub fn unsubscribe(&self, exchange: Exchange, symbol: &str) -> bool {
        self.sets
            .write()
            .get_mut(&exchange)
            .is_some_and(|set| set.remove(&normalize_symbol(symbol)))
    }

    /// Sorted copy of an exchange's symbols.
    ///
    /// Sorted order keeps endpoint URLs and subscribe frames deterministic
    /// across reconnects.
    pub fn snapshot(&self, exchange: Exchange) -> Vec<String> {
        self.sets
            .read()
            .get(&exchange)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of symbols subscribed for an exchange.
    pub fn len(&self, exchange: Exchange) -> usize {
        self.sets
            .read()
            .get(&exchange)
            .map_or(0, BTreeSet::len)
    }

    /// Whether no symbols are subscribed for an exchange.
    pub fn is_empty(&self, exchange: Exchange) -> bool {
        self.len(exchange) == 0
    }
}
