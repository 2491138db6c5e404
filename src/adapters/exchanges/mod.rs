//! Exchange Protocol Adapters - Wire Format Codecs
//!
//! One connector per exchange, each pairing an endpoint/subscription
//! recipe with a pure decoder from raw frames to canonical ticks:
//! - `binance`: combined-stream miniTicker channels, URL-path subscription
//! - `bybit`: publicTrade topics, op/args subscribe frame, batched trades
//! - `kraken`: positional array trade frames, event subscribe frame
//!
//! Decoders share one contract: irrelevant well-formed frames produce zero
//! ticks without error; malformed trade frames produce a `DecodeError`
//! that cycles the connection through backoff.

pub mod binance;
pub mod bybit;
pub mod kraken;

pub use binance::BinanceConnector;
pub use bybit::BybitConnector;
pub use kraken::KrakenConnector;

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::ExchangesConfig;
use crate::domain::tick::Exchange;
use crate::ports::connector::{DecodeError, ExchangeConnector};

/// Build one connector per enabled exchange.
pub fn build_connectors(config: &ExchangesConfig) -> Vec<Arc<dyn ExchangeConnector>> {
    let mut connectors: Vec<Arc<dyn ExchangeConnector>> = Vec::new();
    if config.binance.enabled {
        connectors.push(Arc::new(BinanceConnector::new(
            config.binance.ws_url.clone(),
            config.binance.all_symbols,
        )));
    }
    if config.bybit.enabled {
        connectors.push(Arc::new(BybitConnector::new(config.bybit.ws_url.clone())));
    }
    if config.kraken.enabled {
        connectors.push(Arc::new(KrakenConnector::new(config.kraken.ws_url.clone())));
    }
    connectors
}

/// Parse a decimal-string field, naming it in the error on failure.
fn decimal_field(
    exchange: Exchange,
    field: &'static str,
    raw: &str,
) -> Result<Decimal, DecodeError> {
    raw.parse().map_err(|e| {
        DecodeError::envelope(exchange, format!("{field} {raw:?}: {e}"))
    })
}
