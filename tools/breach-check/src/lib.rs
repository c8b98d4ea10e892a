//! Breach-Check: compromised-credential lookups from the command line
//!
//! Thin wrapper over `shard-filters`: parses arguments and the JSON query
//! record, hands the core a validated secret and prints its answer.
//!
//! ```text
//! breach-check build  --output bloom_filters pwned-1.txt pwned-2.txt
//! breach-check query  --filters bloom_filters '{"secret":"hunter2"}'
//! breach-check inspect --filters bloom_filters aa
//! ```
//!
//! Diagnostics go to stderr through `tracing`; stdout carries only the
//! response record.

pub mod cli;
pub mod commands;
pub mod request;

pub use cli::{Args, BuildArgs, Command, InspectArgs, QueryArgs};
pub use commands::run;
pub use request::{parse_request, InspectReport, QueryRequest, QueryResponse};
