//! Inbound Ports (Driving Ports)
//!
//! The API callers use to ask whether a secret is in the compromised corpus.

use crate::domain::Digest;
use crate::error::FilterError;

/// Membership query API (Driving Port)
///
/// Every method either answers or fails; a failure is never reported as
/// "not found".
pub trait BreachFilterApi: Send + Sync {
    /// Test an arbitrary secret. Hashes it, routes it, loads and decodes its
    /// shard, and tests the digest.
    fn check_secret(&self, secret: &[u8]) -> Result<bool, FilterError>;

    /// Test a digest string (40 hex characters, either case)
    fn check_digest(&self, digest: &str) -> Result<bool, FilterError> {
        let digest = Digest::parse(digest)?;
        self.check_parsed(&digest)
    }

    /// Test an already validated digest
    fn check_parsed(&self, digest: &Digest) -> Result<bool, FilterError>;
}
