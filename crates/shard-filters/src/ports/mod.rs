//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - membership queries
//! - Driven Ports (outbound) - shard persistence and corpus input

pub mod inbound;
pub mod outbound;

pub use inbound::BreachFilterApi;
pub use outbound::{CorpusSource, DigestStream, ShardStore};
