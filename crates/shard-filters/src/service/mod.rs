//! Service Layer
//!
//! Orchestrates domain logic over the driven ports:
//! - `FilterBuilder` / `BuiltFilters` - offline build pipeline
//!   (`Init → PerShardAccumulate → Serialized`)
//! - `QueryEngine` - per-call query pipeline, implements `BreachFilterApi`

pub mod builder;
pub mod query;

pub use builder::{
    build_filters, count_shards, BuiltFilters, BuiltShard, FilterBuilder, ShardCounts,
};
pub use query::QueryEngine;
