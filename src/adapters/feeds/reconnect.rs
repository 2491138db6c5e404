//! Reconnect Backoff Policy
//!
//! Governs the delay between connection attempts after a feed failure.
//! The canonical configuration is a fixed 5 second delay (multiplier 1.0,
//! no jitter); exponential backoff with jitter is a configuration change,
//! not a code change. Retries are unbounded: a supervisor never gives up
//! while it is running.

use std::time::Duration;

use rand::Rng;

use crate::config::FeedConfig;

/// Configuration for the backoff between reconnection attempts.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Ceiling for the scaled delay.
    pub max_delay: Duration,
    /// Multiplier applied after each failed attempt (1.0 = fixed delay).
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10% randomization).
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }
}

impl ReconnectConfig {
    /// Build from the `[feed]` configuration section.
    pub fn from_feed_config(feed: &FeedConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(feed.reconnect_initial_delay_ms),
            max_delay: Duration::from_millis(feed.reconnect_max_delay_ms),
            multiplier: feed.reconnect_multiplier,
            jitter_factor: feed.reconnect_jitter,
        }
    }
}

/// Stateful backoff: scales the delay per failed attempt, resets on success.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt, with jitter applied.
    pub fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        let delay = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier) as u64;
        let capped = u64::try_from(self.config.max_delay.as_millis())
            .unwrap_or(u64::MAX)
            .min(scaled.max(1));
        self.current_delay = Duration::from_millis(capped);

        delay
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempts = 0;
    }

    /// Failed attempts since the last reset.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_ms = delay.as_millis() as f64;
        let range = base_ms * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis((base_ms + jitter).max(1.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_default_is_fixed_five_seconds() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        assert_eq!(policy.next_delay(), Duration::from_secs(5));
        assert_eq!(policy.next_delay(), Duration::from_secs(5));
        assert_eq!(policy.next_delay(), Duration::from_secs(5));
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn exponential_backoff_scales_and_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let mut policy = ReconnectPolicy::new(config);
        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.next_delay(), Duration::from_millis(200));
        assert_eq!(policy.next_delay(), Duration::from_millis(350));
        assert_eq!(policy.next_delay(), Duration::from_millis(350));
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let mut policy = ReconnectPolicy::new(config);
        let _ = policy.next_delay();
        let _ = policy.next_delay();
        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..100 {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                initial_delay: Duration::from_millis(1000),
                max_delay: Duration::from_secs(10),
                multiplier: 1.0,
                jitter_factor: 0.1,
            });
            let ms = policy.next_delay().as_millis();
            assert!((900..=1100).contains(&ms), "delay {ms}ms outside ±10%");
        }
    }
}
