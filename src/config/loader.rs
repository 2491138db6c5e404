//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig = toml::from_str(&content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    service = %config.service.name,
    binance = config.exchanges.binance.enabled,
    bybit = config.exchanges.bybit.enabled,
    kraken = config.exchanges.kraken.enabled,
    cache_ttl_secs = config.feed.cache_ttl_secs,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Sensible timing values (delays, TTL, grace period)
/// - Well-formed WebSocket URLs on every enabled exchange
/// - Non-empty symbol lists where a feed needs them
/// - At least one enabled exchange
pub fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.service.name.is_empty(),
    "service name must not be empty"
  );

  // Feed timing validation
  anyhow::ensure!(
    config.feed.reconnect_initial_delay_ms > 0,
    "reconnect_initial_delay_ms must be positive"
  );
  anyhow::ensure!(
    config.feed.reconnect_max_delay_ms >= config.feed.reconnect_initial_delay_ms,
    "reconnect_max_delay_ms must be >= reconnect_initial_delay_ms"
  );
  anyhow::ensure!(
    config.feed.reconnect_multiplier >= 1.0,
    "reconnect_multiplier must be >= 1.0, got {}",
    config.feed.reconnect_multiplier
  );
  anyhow::ensure!(
    (0.0..1.0).contains(&config.feed.reconnect_jitter),
    "reconnect_jitter must be in [0, 1), got {}",
    config.feed.reconnect_jitter
  );
  anyhow::ensure!(
    config.feed.cache_ttl_secs > 0,
    "cache_ttl_secs must be positive"
  );
  anyhow::ensure!(
    config.feed.channel_capacity > 0,
    "channel_capacity must be positive"
  );
  anyhow::ensure!(
    config.feed.shutdown_grace_secs > 0,
    "shutdown_grace_secs must be positive"
  );

  // Exchange validation
  let ex = &config.exchanges;
  anyhow::ensure!(
    ex.binance.enabled || ex.bybit.enabled || ex.kraken.enabled,
    "at least one exchange feed must be enabled"
  );

  if ex.binance.enabled {
    validate_ws_url("binance", &ex.binance.ws_url)?;
    anyhow::ensure!(
      ex.binance.ws_url.contains("?streams="),
      "binance ws_url must be a combined-stream base ending in ?streams="
    );
    anyhow::ensure!(
      ex.binance.all_symbols || !ex.binance.symbols.is_empty(),
      "binance needs symbols unless all_symbols is set"
    );
  }
  if ex.bybit.enabled {
    validate_ws_url("bybit", &ex.bybit.ws_url)?;
    anyhow::ensure!(
      !ex.bybit.symbols.is_empty(),
      "bybit symbols must not be empty"
    );
  }
  if ex.kraken.enabled {
    validate_ws_url("kraken", &ex.kraken.ws_url)?;
    anyhow::ensure!(
      !ex.kraken.symbols.is_empty(),
      "kraken symbols must not be empty"
    );
  }

  if config.metrics.enabled {
    anyhow::ensure!(
      !config.metrics.bind_address.is_empty(),
      "metrics bind_address must not be empty"
    );
  }

  Ok(())
}

fn validate_ws_url(exchange: &str, url: &str) -> Result<()> {
  anyhow::ensure!(
    url.starts_with("wss://") || url.starts_with("ws://"),
    "{} ws_url must start with ws:// or wss://, got {:?}",
    exchange,
    url
  );
  Ok(())
}
