//! Tick Sink Port - Opaque Push Subscribers
//!
//! A sink is anything that wants every accepted tick pushed to it: a
//! trading engine, a leaderboard refresher, a pub/sub forwarder. The
//! publisher invokes sinks synchronously in registration order and
//! isolates their failures, so a sink must be fast and must never block.

use uuid::Uuid;

use crate::domain::tick::PriceTick;

/// Handle returned by subscriber registration; used for removal.
pub type SubscriberId = Uuid;

/// Synchronous consumer of normalized ticks.
///
/// Errors are logged and isolated by the publisher; they never affect the
/// cache write, other sinks, or the supervisor's receive loop.
pub trait TickSink: Send + Sync {
    /// Deliver one tick. Must not block on I/O.
    fn on_tick(&self, tick: &PriceTick) -> anyhow::Result<()>;
}
