//! Kraken Trade-Frame Adapter
//!
//! Kraken's public feed mixes object frames (heartbeats, system and
//! subscription status) with positional array frames. A trade frame has
//! the literal `"trade"` at index 2, the pair name at the last index and
//! the trade list at index 1; each trade is `[price, volume, epochSeconds,
//! side, orderType, misc]` with every field a string. Epoch seconds carry
//! a fractional part and are scaled to milliseconds.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::decimal_field;
use crate::domain::tick::{normalize_symbol, Exchange, PriceTick};
use crate::ports::connector::{DecodeError, ExchangeConnector};

/// Literal discriminator of a trade frame.
const TRADE_DISCRIMINATOR: &str = "trade";

/// Subscribed when the registry holds no Kraken pairs.
const FALLBACK_SYMBOLS: [&str; 2] = ["XBT/USD", "ETH/USD"];

#[derive(Serialize)]
struct SubscribeFrame {
    event: &'static str,
    pair: Vec<String>,
    subscription: Subscription,
}

#[derive(Serialize)]
struct Subscription {
    name: &'static str,
}

/// Decode one Kraken frame into canonical ticks.
///
/// Object frames are ignored outright, as are array frames that do not
/// carry the trade discriminator. A trade frame with a malformed pair,
/// trade list or trade entry is a decode failure.
pub fn decode(payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;
    let Some(frame) = value.as_array() else {
        return Ok(Vec::new());
    };
    if frame.len() < 4
        || frame.get(2).and_then(Value::as_str) != Some(TRADE_DISCRIMINATOR)
    {
        return Ok(Vec::new());
    }

    let pair = frame
        .last()
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::envelope(Exchange::Kraken, "pair name is not a string"))?;
    let trades = frame
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::envelope(Exchange::Kraken, "trade list is not an array"))?;

    let symbol = normalize_symbol(pair);
    trades.iter().map(|t| tick_from(t, &symbol)).collect()
}

fn tick_from(trade: &Value, symbol: &str) -> Result<PriceTick, DecodeError> {
    let fields = trade
        .as_array()
        .filter(|f| f.len() >= 3)
        .ok_or_else(|| DecodeError::envelope(Exchange::Kraken, "trade entry too short"))?;

    let price = string_decimal(&fields[0], "price")?;
    let volume = string_decimal(&fields[1], "volume")?;
    let seconds = string_decimal(&fields[2], "time")?;
    let timestamp_ms = (seconds * Decimal::from(1000))
        .trunc()
        .to_u64()
        .ok_or_else(|| DecodeError::envelope(Exchange::Kraken, "trade time out of range"))?;

    Ok(PriceTick {
        exchange: Exchange::Kraken,
        symbol: symbol.to_string(),
        price,
        volume,
        timestamp_ms,
    })
}

fn string_decimal(value: &Value, field: &'static str) -> Result<Decimal, DecodeError> {
    let raw = value.as_str().ok_or_else(|| {
        DecodeError::envelope(Exchange::Kraken, format!("{field} is not a string"))
    })?;
    decimal_field(Exchange::Kraken, field, raw)
}

/// Kraken connector: fixed endpoint, event subscribe frame.
pub struct KrakenConnector {
    ws_url: String,
}

impl KrakenConnector {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

impl ExchangeConnector for KrakenConnector {
    fn exchange(&self) -> Exchange {
        Exchange::Kraken
    }

    fn endpoint(&self, _symbols: &[String]) -> String {
        self.ws_url.clone()
    }

    fn subscribe_message(&self, symbols: &[String]) -> Option<String> {
        let frame = SubscribeFrame {
            event: "subscribe",
            pair: symbols.to_vec(),
            subscription: Subscription {
                name: TRADE_DISCRIMINATOR,
            },
        };
        serde_json::to_string(&frame).ok()
    }

    fn decode(&self, payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
        decode(payload)
    }

    fn fallback_symbols(&self) -> &[&'static str] {
        &FALLBACK_SYMBOLS
    }
}
