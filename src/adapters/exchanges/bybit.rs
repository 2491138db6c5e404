//! Bybit Public-Trade Adapter
//!
//! Bybit subscribes after connecting: the endpoint is fixed and a
//! `{"op":"subscribe","args":["publicTrade.{SYMBOL}", ...]}` frame selects
//! the channels. Inbound trade envelopes are `{topic, data}` where `data`
//! is an array of trade records, so a single frame may yield several ticks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decimal_field;
use crate::domain::tick::{normalize_symbol, Exchange, PriceTick};
use crate::ports::connector::{DecodeError, ExchangeConnector};

/// Topic prefix of the public trade channel.
const TRADE_TOPIC_PREFIX: &str = "publicTrade";

/// Subscribed when the registry holds no Bybit symbols.
const FALLBACK_SYMBOLS: [&str; 1] = ["BTCUSDT"];

/// Subscription control frame.
#[derive(Serialize)]
struct SubscribeFrame {
    op: &'static str,
    args: Vec<String>,
}

/// One public trade record.
///
/// Aliases accept both the short v5 keys and the spelled-out variants seen
/// in older payload captures.
#[derive(Debug, Deserialize)]
struct TradeRecord {
    #[serde(rename = "s", alias = "symbol")]
    symbol: String,
    /// Trade price as a decimal string.
    #[serde(rename = "p", alias = "price")]
    price: String,
    /// Trade size as a decimal string.
    #[serde(rename = "v", alias = "size", alias = "volume")]
    volume: String,
    /// Trade time (Unix ms).
    #[serde(rename = "T", alias = "timestamp")]
    timestamp_ms: u64,
}

/// Decode one Bybit envelope into canonical ticks.
///
/// Frames without a `topic` (subscribe acks, pongs) and topics outside
/// `publicTrade` are ignored. A trade topic with a broken record list is a
/// decode failure.
pub fn decode(payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
    let envelope: Value = serde_json::from_str(payload)?;
    let Some(topic) = envelope.get("topic").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };
    if !topic.starts_with(TRADE_TOPIC_PREFIX) {
        return Ok(Vec::new());
    }

    let data = envelope
        .get("data")
        .cloned()
        .ok_or_else(|| DecodeError::envelope(Exchange::Bybit, "missing data field"))?;
    let records: Vec<TradeRecord> = serde_json::from_value(data)
        .map_err(|e| DecodeError::envelope(Exchange::Bybit, e.to_string()))?;

    records.into_iter().map(tick_from).collect()
}

fn tick_from(record: TradeRecord) -> Result<PriceTick, DecodeError> {
    Ok(PriceTick {
        exchange: Exchange::Bybit,
        symbol: normalize_symbol(&record.symbol),
        price: decimal_field(Exchange::Bybit, "price", &record.price)?,
        volume: decimal_field(Exchange::Bybit, "volume", &record.volume)?,
        timestamp_ms: record.timestamp_ms,
    })
}

/// Bybit connector: fixed endpoint, op/args subscribe frame.
pub struct BybitConnector {
    ws_url: String,
}

impl BybitConnector {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }
}

impl ExchangeConnector for BybitConnector {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn endpoint(&self, _symbols: &[String]) -> String {
        self.ws_url.clone()
    }

    fn subscribe_message(&self, symbols: &[String]) -> Option<String> {
        let frame = SubscribeFrame {
            op: "subscribe",
            args: symbols
                .iter()
                .map(|s| format!("{TRADE_TOPIC_PREFIX}.{s}"))
                .collect(),
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
