//! Canonical market data types.
//!
//! Every exchange feed is normalized into a [`PriceTick`] before it touches
//! the cache or any subscriber. Adapters are the only producers of ticks;
//! downstream code never sees exchange wire formats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported upstream exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Bybit,
    Kraken,
}

impl Exchange {
    /// All supported exchanges, in supervisor spawn order.
    pub const ALL: [Self; 3] = [Self::Binance, Self::Bybit, Self::Kraken];

    /// Lowercase identifier used in cache keys and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Bybit => "bybit",
            Self::Kraken => "kraken",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown exchange name.
#[derive(Debug, thiserror::Error)]
#[error("unknown exchange: {0}")]
pub struct ParseExchangeError(String);

impl std::str::FromStr for Exchange {
    type Err = ParseExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "bybit" => Ok(Self::Bybit),
            "kraken" => Ok(Self::Kraken),
            _ => Err(ParseExchangeError(s.to_string())),
        }
    }
}

/// Normalize a symbol to its canonical form: trimmed, ASCII upper-case.
///
/// Applied by every protocol adapter and by the subscription registry so
/// that `btcusdt`, `BTCUSDT` and ` BTCUSDT ` all address the same key.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// One normalized price observation from an exchange trade/ticker stream.
///
/// Immutable once constructed. Produced only by protocol adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// Originating exchange.
    pub exchange: Exchange,
    /// Canonical (upper-case) symbol, e.g. `BTCUSDT` or `XBT/USD`.
    pub symbol: String,
    /// Last trade / ticker price.
    pub price: Decimal,
    /// Trade quantity or ticker base volume.
    pub volume: Decimal,
    /// Observation time in Unix milliseconds.
    pub timestamp_ms: u64,
}

impl PriceTick {
    /// Cache key for this tick: `price:{exchange}:{symbol}`.
    pub fn cache_key(&self) -> String {
        Self::key(self.exchange, &self.symbol)
    }

    /// Cache key for an arbitrary (exchange, symbol) pair.
    ///
    /// The symbol is expected to be normalized already.
    pub fn key(exchange: Exchange, symbol: &str) -> String {
        format!("price:{exchange}:{symbol}")
    }

    /// Observation time as a UTC timestamp.
    ///
    /// `None` for timestamps beyond chrono's representable range.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}
