//! JSON request and response records

use std::fmt;

use serde::{Deserialize, Serialize};
use shard_filters::{BloomFilter, FilterError, ShardKey};

/// Query request: `{"secret": "..."}`
///
/// `password` is accepted in place of `secret`.
#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "password")]
    pub secret: String,
}

// Keeps the secret out of logs and panic messages
impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parse a query request, reporting any malformation as an input error
pub fn parse_request(input: &str) -> Result<QueryRequest, FilterError> {
    let invalid =
        |e: serde_json::Error| FilterError::Input(format!("invalid query request: {}", e));

    let value: serde_json::Value = serde_json::from_str(input).map_err(invalid)?;
    if !value.is_object() {
        return Err(FilterError::Input(
            "query request must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(invalid)
}

/// Query response: exactly `{"found":true}` or `{"found":false}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub found: bool,
}

/// Shard statistics printed by `inspect`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InspectReport {
    pub shard: String,
    pub size_bits: usize,
    pub hash_count: usize,
    pub bytes: usize,
    pub bits_set: usize,
    pub fill_ratio: f64,
    pub estimated_fpr: f64,
    /// Element count recorded in the build manifest, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<u64>,
}

impl InspectReport {
    pub fn new(key: ShardKey, filter: &BloomFilter, bytes: usize, elements: Option<u64>) -> Self {
        Self {
            shard: key.to_string(),
            size_bits: filter.size_bits(),
            hash_count: filter.hash_count(),
            bytes,
            bits_set: filter.bits_set(),
            fill_ratio: filter.fill_ratio(),
            estimated_fpr: filter.estimated_fpr(),
            elements,
        }
    }
}
