//! Exchange Connector Port - Per-exchange Protocol Seam
//!
//! Each exchange differs from the others in exactly three ways: how the
//! endpoint URL is built from the subscribed symbols, whether subscription
//! is expressed in the URL path or as a post-connect control frame, and the
//! shape of the inbound messages. This trait captures those three points so
//! a single connection supervisor can drive every exchange.

use crate::domain::tick::{Exchange, PriceTick};

/// Decode failure taxonomy for inbound frames.
///
/// A frame that is well-formed but irrelevant (heartbeat, ack, subscription
/// confirmation, unrelated channel) is NOT an error; adapters return an
/// empty tick list for those. Errors here mean the payload is structurally
/// broken and the connection should cycle through backoff, since a malformed
/// envelope may indicate protocol drift.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid JSON at all.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A trade-discriminated frame with malformed or missing fields.
    #[error("malformed {exchange} frame: {detail}")]
    Envelope {
        exchange: Exchange,
        detail: String,
    },
}

impl DecodeError {
    /// Shorthand for a malformed-envelope error.
    pub fn envelope(exchange: Exchange, detail: impl Into<String>) -> Self {
        Self::Envelope {
            exchange,
            detail: detail.into(),
        }
    }
}

/// Protocol and endpoint description for one exchange.
///
/// Implementations are stateless apart from configuration; `decode` in
/// particular is a pure function so wire contracts stay testable without
/// a socket anywhere in sight.
pub trait ExchangeConnector: Send + Sync + 'static {
    /// Which exchange this connector speaks for.
    fn exchange(&self) -> Exchange;

    /// WebSocket URL to dial for the given subscription snapshot.
    ///
    /// Exchanges that subscribe via a control frame ignore `symbols` here.
    fn endpoint(&self, symbols: &[String]) -> String;

    /// Post-connect subscription frame, if the protocol requires one.
    ///
    /// `None` means subscription is fully expressed by the endpoint URL.
    fn subscribe_message(&self, symbols: &[String]) -> Option<String>;

    /// Map one inbound text frame to zero or more canonical ticks.
    ///
    /// Irrelevant frames yield `Ok(vec![])`; malformed frames yield an
    /// error that sends the supervisor into backoff.
    fn decode(&self, payload: &str) -> Result<Vec<PriceTick>, DecodeError>;

    /// Symbols to subscribe when the registry holds none for this exchange.
    ///
    /// Keeps the feed non-empty before any consumer has subscribed.
    fn fallback_symbols(&self) -> &[&'static str];
}
