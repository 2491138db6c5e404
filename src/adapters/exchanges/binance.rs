//! Binance Combined-Stream Adapter
//!
//! Binance expresses subscription entirely in the URL path: the endpoint is
//! the combined-stream base plus a `/`-joined list of
//! `{symbol}@miniTicker` stream names. No control frame is sent after
//! connecting. Inbound envelopes are `{stream, data}` where `data` is one
//! miniTicker object, or an array of them on the all-symbols wildcard
//! stream `!miniTicker@arr` (one line of config ingests every pair on the
//! exchange).

use serde::Deserialize;
use serde_json::Value;

use super::decimal_field;
use crate::domain::tick::{normalize_symbol, Exchange, PriceTick};
use crate::ports::connector::{DecodeError, ExchangeConnector};

/// Stream name suffix identifying a miniTicker channel.
const TICKER_SUFFIX: &str = "@miniTicker";

/// The every-pair wildcard stream.
const WILDCARD_STREAM: &str = "!miniTicker@arr";

/// Subscribed when the registry holds no Binance symbols.
const FALLBACK_SYMBOLS: [&str; 2] = ["BTCUSDT", "ETHUSDT"];

/// Binance miniTicker payload (the fields this pipeline consumes).
#[derive(Debug, Deserialize)]
struct MiniTickerMsg {
    /// Symbol.
    s: String,
    /// Close (last) price as a decimal string.
    c: String,
    /// Base asset volume as a decimal string.
    v: String,
    /// Event time (Unix ms).
    #[serde(rename = "E")]
    event_time: u64,
}

/// Decode one combined-stream envelope into canonical ticks.
///
/// Envelopes without a `stream` field (acks and other control frames) and
/// streams that are not miniTicker channels are ignored. A matched stream
/// with a broken `data` payload is a decode failure.
pub fn decode(payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
    let envelope: Value = serde_json::from_str(payload)?;
    let Some(stream) = envelope.get("stream").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };

    let batch = stream == WILDCARD_STREAM;
    if !batch && !stream.ends_with(TICKER_SUFFIX) {
        return Ok(Vec::new());
    }

    let data = envelope
        .get("data")
        .cloned()
        .ok_or_else(|| DecodeError::envelope(Exchange::Binance, "missing data field"))?;

    let messages: Vec<MiniTickerMsg> = if batch {
        serde_json::from_value(data)
            .map_err(|e| DecodeError::envelope(Exchange::Binance, e.to_string()))?
    } else {
        vec![serde_json::from_value(data)
            .map_err(|e| DecodeError::envelope(Exchange::Binance, e.to_string()))?]
    };

    messages.into_iter().map(tick_from).collect()
}

fn tick_from(msg: MiniTickerMsg) -> Result<PriceTick, DecodeError> {
    Ok(PriceTick {
        exchange: Exchange::Binance,
        symbol: normalize_symbol(&msg.s),
        price: decimal_field(Exchange::Binance, "c", &msg.c)?,
        volume: decimal_field(Exchange::Binance, "v", &msg.v)?,
        timestamp_ms: msg.event_time,
    })
}

/// Binance connector: URL-path subscription, combined-stream decoding.
pub struct BinanceConnector {
    /// Combined-stream base URL, ending in `?streams=`.
    ws_url: String,
    /// Ingest every pair via the wildcard stream instead of named symbols.
    all_symbols: bool,
}

impl BinanceConnector {
    pub fn new(ws_url: impl Into<String>, all_symbols: bool) -> Self {
        Self {
            ws_url: ws_url.into(),
            all_symbols,
        }
    }
}

impl ExchangeConnector for BinanceConnector {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn endpoint(&self, symbols: &[String]) -> String {
        let streams: Vec<String> = if self.all_symbols {
            vec![WILDCARD_STREAM.to_string()]
        } else {
            symbols
                .iter()
                .map(|s| format!("{}{TICKER_SUFFIX}", s.to_ascii_lowercase()))
                .collect()
        };
        format!("{}{}", self.ws_url, streams.join("/"))
    }

    fn subscribe_message(&self, _symbols: &[String]) -> Option<String> {
        None
    }

    fn decode(&self, payload: &str) -> Result<Vec<PriceTick>, DecodeError> {
        decode(payload)
    }

    fn fallback_symbols(&self) -> &[&'static str] {
        &FALLBACK_SYMBOLS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BASE: &str = "wss://stream.binance.com:9443/stream?streams=";

    #[test]
    fn decodes_mini_ticker_envelope() {
        let payload = r#"{
            "stream": "btcusdt@miniTicker",
            "data": {"e":"24hrMiniTicker","E":1700000000123,"s":"BTCUSDT",
                     "c":"50000.10","o":"49000.00","h":"51000.00","l":"48500.00",
                     "v":"1234.5","q":"61000000.0"}
        }"#;
        let ticks = decode(payload).unwrap();
        assert_eq!(ticks.len(), 1);
        let tick = &ticks[0];
        assert_eq!(tick.exchange, Exchange::Binance);
        assert_eq!(tick.symbol, "BTCUSDT");
        assert_eq!(tick.price, dec!(50000.10));
        assert_eq!(tick.volume, dec!(1234.5));
        assert_eq!(tick.timestamp_ms, 1_700_000_000_123);
    }

    #[test]
    fn other_stream_suffix_yields_no_ticks() {
        let payload = r#"{"stream":"btcusdt@depth","data":{"bids":[],"asks":[]}}"#;
        assert!(decode(payload).unwrap().is_empty());
    }

    #[test]
    fn control_frame_without_stream_is_ignored() {
        let payload = r#"{"result":null,"id":1}"#;
        assert!(decode(payload).unwrap().is_empty());
    }

    #[test]
    fn wildcard_stream_decodes_a_batch() {
        let payload = r#"{
            "stream": "!miniTicker@arr",
            "data": [
                {"E":1700000000001,"s":"BTCUSDT","c":"50000.1","v":"1.0"},
                {"E":1700000000002,"s":"ethusdt","c":"3000.5","v":"2.0"}
            ]
        }"#;
        let ticks = decode(payload).unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].symbol, "BTCUSDT");
        assert_eq!(ticks[1].symbol, "ETHUSDT");
        assert_eq!(ticks[1].price, dec!(3000.5));
    }

    #[test]
    fn malformed_price_is_a_decode_error() {
        let payload = r#"{
            "stream": "btcusdt@miniTicker",
            "data": {"E":1700000000123,"s":"BTCUSDT","c":"not-a-price","v":"1.0"}
        }"#;
        assert!(decode(payload).is_err());
    }

    #[test]
    fn non_json_payload_is_a_decode_error() {
        assert!(decode("definitely not json").is_err());
    }

    #[test]
    fn endpoint_joins_lowercased_stream_names() {
        let connector = BinanceConnector::new(BASE, false);
        let url = connector
            .endpoint(&["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
        assert_eq!(
            url,
            format!("{BASE}btcusdt@miniTicker/ethusdt@miniTicker")
        );
        assert!(connector.subscribe_message(&[]).is_none());
    }

    #[test]
    fn wildcard_mode_uses_the_arr_stream() {
        let connector = BinanceConnector::new(BASE, true);
        let url = connector.endpoint(&["BTCUSDT".to_string()]);
        assert_eq!(url, format!("{BASE}!miniTicker@arr"));
    }
}
