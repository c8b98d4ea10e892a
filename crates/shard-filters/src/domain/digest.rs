//! Digest computation and canonical digest strings
//!
//! A digest is the SHA-1 of a secret rendered as 40 uppercase hexadecimal
//! characters. Corpus files carry digests in this form, and the bloom filters
//! are keyed on these 40 ASCII bytes.

use sha1::{Digest as _, Sha1};

use crate::error::{DigestFault, FilterError};

/// Length of a canonical digest string
pub const DIGEST_HEX_LEN: usize = 40;

/// A validated, canonical (uppercase) 160-bit digest string
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest {
    hex: String,
}

impl Digest {
    /// Hash an arbitrary byte string. Total: never fails, including for
    /// empty input.
    pub fn of(secret: &[u8]) -> Self {
        let hash = Sha1::digest(secret);
        Self {
            hex: hex::encode_upper(hash),
        }
    }

    /// Parse a digest string, accepting either hex case.
    ///
    /// Anything other than exactly 40 hex characters is rejected; the input
    /// is never truncated or padded.
    pub fn parse(value: &str) -> Result<Self, FilterError> {
        validate(value)?;
        Ok(Self {
            hex: value.to_ascii_uppercase(),
        })
    }

    /// Canonical uppercase form
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// The element bytes inserted into and tested against a bloom filter
    pub fn as_bytes(&self) -> &[u8] {
        self.hex.as_bytes()
    }

    /// First byte of the digest, decoded from its two leading hex characters
    pub(crate) fn prefix_byte(&self) -> u8 {
        let bytes = self.hex.as_bytes();
        (nibble(bytes[0]) << 4) | nibble(bytes[1])
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex)
    }
}

impl std::str::FromStr for Digest {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Callers only pass characters already validated as uppercase hex
fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        _ => c - b'A' + 10,
    }
}

/// Check that `value` is exactly 40 hex characters
pub(crate) fn validate(value: &str) -> Result<(), FilterError> {
    let fault = if value.len() != DIGEST_HEX_LEN {
        Some(DigestFault::Length(value.len()))
    } else {
        value
            .bytes()
            .position(|b| !b.is_ascii_hexdigit())
            .map(DigestFault::NonHex)
    };

    match fault {
        Some(reason) => Err(FilterError::DigestFormat {
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
