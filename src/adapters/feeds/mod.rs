//! Feed Supervision - Connection Lifecycle with Auto-Reconnect
//!
//! Transport-side machinery shared by every exchange:
//! - `supervisor`: the per-exchange connect/stream/backoff state machine
//! - `reconnect`: the configurable backoff policy between attempts

pub mod reconnect;
pub mod supervisor;

pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
