//! Shard file encoding
//!
//! ## Format (version 1)
//!
//! All integers little-endian.
//!
//! ```text
//! ┌───────────┬─────────────┬─────────────┬─────────────┐
//! │ Magic (4) │ Version (2) │ Family (1)  │ Reserved(1) │
//! ├───────────┴─────────────┴─────────────┴─────────────┤
//! │ k: u32 │ m: u64 │ byte_len: u64                     │
//! ├─────────────────────────────────────────────────────┤
//! │ Packed bits (byte_len = ceil(m / 8), LSB first)     │
//! ├─────────────────────────────────────────────────────┤
//! │ CRC32 over everything above: u32                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! A decode failure is always an error. Substituting an empty filter would
//! turn true positives into false negatives.

use super::bloom_filter::BloomFilter;
use super::hash_functions::HASH_FAMILY_MURMUR3_DOUBLE;
use super::parameters::MAX_HASH_COUNT;
use crate::error::DecodeError;

/// Magic bytes opening every shard file
pub const MAGIC: [u8; 4] = *b"SBLM";
/// Current format version
pub const FORMAT_VERSION: u16 = 1;
/// Header size in bytes
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8 + 8;
/// Trailer (checksum) size in bytes
pub const TRAILER_LEN: usize = 4;

/// Encode a filter into its self-describing binary form
pub fn encode(filter: &BloomFilter) -> Vec<u8> {
    let bits = filter.as_raw_bytes();
    let mut out = Vec::with_capacity(HEADER_LEN + bits.len() + TRAILER_LEN);

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(HASH_FAMILY_MURMUR3_DOUBLE);
    out.push(0);
    out.extend_from_slice(&(filter.hash_count() as u32).to_le_bytes());
    out.extend_from_slice(&(filter.size_bits() as u64).to_le_bytes());
    out.extend_from_slice(&(bits.len() as u64).to_le_bytes());
    out.extend_from_slice(bits);

    let crc = crc32fast::hash(&out);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Decode a filter, validating every header field and the checksum
pub fn decode(bytes: &[u8]) -> Result<BloomFilter, DecodeError> {
    let header = Header::parse(bytes)?;

    let expected_bytes = header.m.div_ceil(8);
    if header.byte_len != expected_bytes {
        return Err(DecodeError::LengthMismatch {
            declared: header.byte_len,
            actual: expected_bytes,
        });
    }

    let body_len = (bytes.len() - HEADER_LEN - TRAILER_LEN) as u64;
    if body_len != header.byte_len {
        return Err(DecodeError::LengthMismatch {
            declared: header.byte_len,
            actual: body_len,
        });
    }

    let (payload, trailer) = bytes.split_at(bytes.len() - TRAILER_LEN);
    let stored = u32::from_le_bytes(read_array(trailer, 0));
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    let bits = &payload[HEADER_LEN..];
    let tail_bits = (header.m % 8) as u32;
    if tail_bits != 0 {
        let last = bits[bits.len() - 1];
        if last >> tail_bits != 0 {
            return Err(DecodeError::NonZeroPadding { m: header.m });
        }
    }

    Ok(BloomFilter::from_raw_parts(
        header.m as usize,
        header.k as usize,
        bits.to_vec(),
    ))
}

/// Header fields, available without decoding the bit array
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub hash_family: u8,
    pub k: u32,
    pub m: u64,
    pub byte_len: u64,
}

impl Header {
    /// Parse and validate the fixed-size header
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let needed = HEADER_LEN + TRAILER_LEN;
        if bytes.len() < needed {
            return Err(DecodeError::Truncated {
                len: bytes.len(),
                needed,
            });
        }

        let magic: [u8; 4] = read_array(bytes, 0);
        if magic != MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }

        let version = u16::from_le_bytes(read_array(bytes, 4));
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let hash_family = bytes[6];
        if hash_family != HASH_FAMILY_MURMUR3_DOUBLE {
            return Err(DecodeError::UnknownHashFamily(hash_family));
        }

        if bytes[7] != 0 {
            return Err(DecodeError::ReservedNotZero(bytes[7]));
        }

        let k = u32::from_le_bytes(read_array(bytes, 8));
        let m = u64::from_le_bytes(read_array(bytes, 12));
        let byte_len = u64::from_le_bytes(read_array(bytes, 20));

        if k == 0 || k as usize > MAX_HASH_COUNT || m == 0 || usize::try_from(m).is_err() {
            return Err(DecodeError::InvalidParameters { m, k });
        }

        Ok(Self {
            version,
            hash_family,
            k,
            m,
            byte_len,
        })
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_filter() -> BloomFilter {
        let mut filter = BloomFilter::new(1_003, 7);
        for i in 0..50u32 {
            filter.insert(format!("{:040X}", i).as_bytes());
        }
        filter
    }

    #[test]
    fn test_roundtrip_empty_filter() {
        let filter = BloomFilter::new(64, 3);
        let decoded = decode(&encode(&filter)).expect("empty filter must decode");
        assert_eq!(decoded, filter);
    }

    #[test]
    fn test_roundtrip_populated_filter() {
        let filter = sample_filter();
        let decoded = decode(&encode(&filter)).expect("filter must decode");

        assert_eq!(decoded.size_bits(), 1_003);
        assert_eq!(decoded.hash_count(), 7);
        assert_eq!(decoded.as_raw_bytes(), filter.as_raw_bytes());
        assert!(decoded.contains(format!("{:040X}", 7).as_bytes()));
    }

    #[test]
    fn test_encoded_layout() {
        let mut filter = BloomFilter::new(10, 1);
        filter.insert(b"x");
        let bytes = encode(&filter);

        assert_eq!(&bytes[0..4], b"SBLM");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        assert_eq!(bytes[6], HASH_FAMILY_MURMUR3_DOUBLE);
        assert_eq!(u32::from_le_bytes(read_array(&bytes, 8)), 1);
        assert_eq!(u64::from_le_bytes(read_array(&bytes, 12)), 10);
        assert_eq!(u64::from_le_bytes(read_array(&bytes, 20)), 2);
        assert_eq!(bytes.len(), HEADER_LEN + 2 + TRAILER_LEN);
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let bytes = encode(&sample_filter());

        assert!(matches!(
            decode(&bytes[..10]),
            Err(DecodeError::Truncated { .. })
        ));
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(DecodeError::LengthMismatch { .. })
        ));
        assert!(matches!(decode(&[]), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_decode_rejects_bad_magic_and_version() {
        let mut bytes = encode(&sample_filter());
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(DecodeError::BadMagic(_))));

        let mut bytes = encode(&sample_filter());
        bytes[4] = 2;
        assert_eq!(decode(&bytes), Err(DecodeError::UnsupportedVersion(2)));

        let mut bytes = encode(&sample_filter());
        bytes[6] = 9;
        assert_eq!(decode(&bytes), Err(DecodeError::UnknownHashFamily(9)));
    }

    #[test]
    fn test_decode_rejects_nonzero_reserved_byte() {
        let mut bytes = encode(&sample_filter());
        bytes[7] = 0xAB;
        let crc_at = bytes.len() - TRAILER_LEN;
        let crc = crc32fast::hash(&bytes[..crc_at]);
        bytes[crc_at..].copy_from_slice(&crc.to_le_bytes());

        assert_eq!(decode(&bytes), Err(DecodeError::ReservedNotZero(0xAB)));
    }

    #[test]
    fn test_decode_rejects_flipped_bit() {
        let mut bytes = encode(&sample_filter());
        bytes[HEADER_LEN + 3] ^= 0x10;
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_zero_k() {
        let mut bytes = encode(&sample_filter());
        bytes[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::InvalidParameters { k: 0, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_dirty_padding() {
        // m = 10 leaves 6 unused bits in the second byte
        let filter = BloomFilter::new(10, 2);
        let mut bytes = encode(&filter);
        bytes[HEADER_LEN + 1] = 0x80;
        let crc_at = bytes.len() - TRAILER_LEN;
        let crc = crc32fast::hash(&bytes[..crc_at]);
        bytes[crc_at..].copy_from_slice(&crc.to_le_bytes());

        assert_eq!(decode(&bytes), Err(DecodeError::NonZeroPadding { m: 10 }));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_is_identity(
            m in 1usize..4096,
            k in 1usize..16,
            elements in proptest::collection::vec(any::<u64>(), 0..64),
        ) {
            let mut filter = BloomFilter::new(m, k);
            for e in &elements {
                filter.insert(&e.to_le_bytes());
            }
            let decoded = decode(&encode(&filter)).unwrap();
            prop_assert_eq!(decoded, filter);
        }
    }
}
