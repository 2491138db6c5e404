//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (WebSockets, Prometheus). Each sub-module groups
//! adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `exchanges`: per-exchange wire codecs and endpoint recipes
//! - `feeds`: connection supervision with auto-reconnect
//! - `metrics`: Prometheus metrics registry

pub mod exchanges;
pub mod feeds;
pub mod metrics;
