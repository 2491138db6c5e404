//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Endpoint URLs,
//! default symbols and all timing knobs are externalized here - nothing
//! is hardcoded in the supervision or domain layers.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before any feed starts. Every section carries sensible defaults so a
/// minimal file is enough to run.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Feed timing: reconnect policy, cache TTL, channel sizing.
  #[serde(default)]
  pub feed: FeedConfig,
  /// Per-exchange endpoints and default symbols.
  #[serde(default)]
  pub exchanges: ExchangesConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_service_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_service_name(),
      log_level: default_log_level(),
    }
  }
}

/// Feed timing and sizing configuration.
///
/// The reconnect defaults encode the canonical fixed 5 s backoff; set
/// `reconnect_multiplier` above 1.0 (and optionally `reconnect_jitter`)
/// for exponential backoff with jitter.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  /// Delay before the first reconnection attempt (milliseconds).
  #[serde(default = "default_reconnect_initial_delay_ms")]
  pub reconnect_initial_delay_ms: u64,
  /// Ceiling for the scaled reconnect delay (milliseconds).
  #[serde(default = "default_reconnect_max_delay_ms")]
  pub reconnect_max_delay_ms: u64,
  /// Backoff multiplier per failed attempt (1.0 = fixed delay).
  #[serde(default = "default_reconnect_multiplier")]
  pub reconnect_multiplier: f64,
  /// Jitter fraction applied to each delay (0.0 = none).
  #[serde(default)]
  pub reconnect_jitter: f64,
  /// Cached tick time-to-live (seconds).
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
  /// Broadcast channel capacity for the shared update stream.
  #[serde(default = "default_channel_capacity")]
  pub channel_capacity: usize,
  /// Grace period for joining feed tasks on shutdown (seconds).
  #[serde(default = "default_shutdown_grace_secs")]
  pub shutdown_grace_secs: u64,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
      reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
      reconnect_multiplier: default_reconnect_multiplier(),
      reconnect_jitter: 0.0,
      cache_ttl_secs: default_cache_ttl_secs(),
      channel_capacity: default_channel_capacity(),
      shutdown_grace_secs: default_shutdown_grace_secs(),
    }
  }
}

/// Per-exchange feed configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangesConfig {
  #[serde(default)]
  pub binance: BinanceConfig,
  #[serde(default)]
  pub bybit: BybitConfig,
  #[serde(default)]
  pub kraken: KrakenConfig,
}

/// Binance feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
  /// Whether this feed runs at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Combined-stream base URL, ending in `?streams=`.
  #[serde(default = "default_binance_ws_url")]
  pub ws_url: String,
  /// Symbols subscribed at startup.
  #[serde(default = "default_binance_symbols")]
  pub symbols: Vec<String>,
  /// Ingest every pair via the `!miniTicker@arr` wildcard stream.
  #[serde(default)]
  pub all_symbols: bool,
}

impl Default for BinanceConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ws_url: default_binance_ws_url(),
      symbols: default_binance_symbols(),
      all_symbols: false,
    }
  }
}

/// Bybit feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BybitConfig {
  /// Whether this feed runs at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Public spot WebSocket URL.
  #[serde(default = "default_bybit_ws_url")]
  pub ws_url: String,
  /// Symbols subscribed at startup.
  #[serde(default = "default_bybit_symbols")]
  pub symbols: Vec<String>,
}

impl Default for BybitConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ws_url: default_bybit_ws_url(),
      symbols: default_bybit_symbols(),
    }
  }
}

/// Kraken feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenConfig {
  /// Whether this feed runs at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Public WebSocket URL.
  #[serde(default = "default_kraken_ws_url")]
  pub ws_url: String,
  /// Pairs subscribed at startup.
  #[serde(default = "default_kraken_symbols")]
  pub symbols: Vec<String>,
}

impl Default for KrakenConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ws_url: default_kraken_ws_url(),
      symbols: default_kraken_symbols(),
    }
  }
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable the HTTP health/metrics server.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address for /live, /ready and /metrics.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_service_name() -> String {
  "market-feed-hub".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_reconnect_initial_delay_ms() -> u64 {
  5_000
}

fn default_reconnect_max_delay_ms() -> u64 {
  60_000
}

fn default_reconnect_multiplier() -> f64 {
  1.0
}

fn default_cache_ttl_secs() -> u64 {
  60
}

fn default_channel_capacity() -> usize {
  4096
}

fn default_shutdown_grace_secs() -> u64 {
  5
}

fn default_binance_ws_url() -> String {
  "wss://stream.binance.com:9443/stream?streams=".to_string()
}

fn default_binance_symbols() -> Vec<String> {
  vec![
    "BTCUSDT".to_string(),
    "ETHUSDT".to_string(),
    "SOLUSDT".to_string(),
  ]
}

fn default_bybit_ws_url() -> String {
  "wss://stream.bybit.com/v5/public/spot".to_string()
}

fn default_bybit_symbols() -> Vec<String> {
  vec!["BTCUSDT".to_string()]
}

fn default_kraken_ws_url() -> String {
  "wss://ws.kraken.com".to_string()
}

fn default_kraken_symbols() -> Vec<String> {
  vec!["XBT/USD".to_string(), "ETH/USD".to_string()]
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
