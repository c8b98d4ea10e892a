//! Hash functions for the shard bloom filters
//!
//! Shard files must stay readable by any implementation, so the hash family
//! is pinned and versioned alongside the encoding:
//!
//! - Family 1: MurmurHash3 x64_128, low 64 bits, seeds 0 and 1, combined by
//!   double hashing `h(i) = h1 + i * h2 (mod m)` with wrapping arithmetic.

use std::io::Cursor;

/// Identifier of the hash family written into every shard file
pub const HASH_FAMILY_MURMUR3_DOUBLE: u8 = 1;

const SEED_H1: u32 = 0;
const SEED_H2: u32 = 1;

/// Hash an element with MurmurHash3 x64_128 and keep the lower 64 bits
pub fn murmur_hash(element: &[u8], seed: u32) -> u64 {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory cursor cannot fail.
    let hash = murmur3::murmur3_x64_128(&mut cursor, seed).unwrap_or(0);
    hash as u64
}

/// Iterator over the k bit positions of an element in an m-bit array
#[derive(Clone, Debug)]
pub struct HashPositions {
    h1: u64,
    h2: u64,
    m: u64,
    i: u64,
    k: u64,
}

impl Iterator for HashPositions {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i >= self.k {
            return None;
        }
        let hash = self.h1.wrapping_add(self.i.wrapping_mul(self.h2));
        self.i += 1;
        Some((hash % self.m) as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.k - self.i) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for HashPositions {}

/// Compute the k hash positions for an element.
///
/// `m` must be non-zero; filters never hold an empty bit array.
pub fn hash_positions(element: &[u8], k: usize, m: usize) -> HashPositions {
    HashPositions {
        h1: murmur_hash(element, SEED_H1),
        h2: murmur_hash(element, SEED_H2),
        m: m.max(1) as u64,
        i: 0,
        k: k as u64,
    }
}
