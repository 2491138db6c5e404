//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the rest of the system plugs into.
//! Adapters implement the outbound ones; external collaborators consume
//! the inbound ones.
//!
//! Port categories:
//! - `ExchangeConnector`: per-exchange protocol and endpoint description
//! - `TickSink`: opaque push subscriber for accepted ticks
//! - `PriceSource`: latest-price lookup for the rest of the application

pub mod connector;
pub mod price_source;
pub mod sink;

pub use connector::{DecodeError, ExchangeConnector};
pub use price_source::PriceSource;
pub use sink::{SubscriberId, TickSink};
