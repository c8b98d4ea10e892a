//! Bloom filter sizing
//!
//! Formulas:
//! - m = ceil(-n*ln(p) / (ln(2)^2))  -- bits for target rate p
//! - k = round((m/n) * ln(2))        -- optimal hash functions, at least 1
//! - m = ceil(n*k / ln(2))           -- bits for which a given k is optimal
//! - FPR = (1 - e^(-kn/m))^k

use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

/// Upper bound on the hash function count accepted anywhere
pub const MAX_HASH_COUNT: usize = 64;

/// Sized bloom filter parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BloomFilterParams {
    /// Number of bits in the filter (m)
    pub size_bits: usize,
    /// Number of hash functions (k)
    pub hash_count: usize,
    /// Expected false positive rate at the sized element count
    pub expected_fpr: f64,
}

/// Parameters for `num_elements` at `target_fpr`
pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 0.0,
        };
    }

    let m = minimum_bits(num_elements, target_fpr).max(1);
    let k = optimal_k(m, num_elements);

    BloomFilterParams {
        size_bits: m,
        hash_count: k,
        expected_fpr: calculate_fpr(m, num_elements, k),
    }
}

/// Parameters for `num_elements` with a fixed hash count
pub fn parameters_for_hash_count(num_elements: usize, hash_count: usize) -> BloomFilterParams {
    let k = hash_count.clamp(1, MAX_HASH_COUNT);
    let m = ((num_elements as f64 * k as f64) / LN_2).ceil().max(1.0) as usize;

    BloomFilterParams {
        size_bits: m,
        hash_count: k,
        expected_fpr: calculate_fpr(m, num_elements, k),
    }
}

/// Theoretical rate `(1 - e^(-kn/m))^k` after `n` inserts
pub fn calculate_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}

/// Optimal k for given m and n, never below 1
pub fn optimal_k(m: usize, n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let k = ((m as f64 / n as f64) * LN_2).round() as usize;
    k.clamp(1, MAX_HASH_COUNT)
}

/// Minimum m for given n and target FPR
pub fn minimum_bits(n: usize, target_fpr: f64) -> usize {
    let ln2_squared = LN_2 * LN_2;
    (-(n as f64) * target_fpr.ln() / ln2_squared).ceil() as usize
}

/// FPR estimated from the fraction of set bits, `(set/m)^k`.
///
/// Unlike `calculate_fpr` this needs no element count, so it is available
/// for decoded filters.
pub fn fpr_from_fill(bits_set: usize, m: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    (bits_set as f64 / m as f64).powi(k as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_parameters_n100_fpr001() {
        // For n=100, FPR=0.01 → m=959, k=7
        let params = calculate_optimal_parameters(100, 0.01);

        assert_eq!(params.size_bits, 959);
        assert_eq!(params.hash_count, 7);
    }

    #[test]
    fn test_default_shard_sizing_gives_ten_hashes() {
        let params = calculate_optimal_parameters(2_000_000, 0.001);
        assert_eq!(params.hash_count, 10);
        assert!(
            params.size_bits > 28_000_000 && params.size_bits < 29_000_000,
            "Expected m≈28.76M, got m={}",
            params.size_bits
        );
    }

    #[test]
    fn test_reference_pair_rate_at_expected_load() {
        // m = 17,971,985 and k = 10 against 1.2M digests in one shard
        let rate = calculate_fpr(17_971_985, 1_200_000, 10);
        assert!(rate < 0.001, "reference pair should stay under 0.1%: {}", rate);
    }

    #[test]
    fn test_sized_rate_never_exceeds_target() {
        for (n, p) in [(1usize, 0.5), (40, 0.01), (7_812, 0.001), (2_000_000, 0.0001)] {
            let params = calculate_optimal_parameters(n, p);
            assert!(
                params.expected_fpr <= p * 1.05,
                "n={} p={} sized to {}",
                n,
                p,
                params.expected_fpr
            );
        }
    }

    #[test]
    fn test_empty_shard_gets_minimal_filter() {
        let params = calculate_optimal_parameters(0, 0.001);
        assert_eq!((params.size_bits, params.hash_count), (1, 1));
        assert_eq!(params.expected_fpr, 0.0);
    }

    #[test]
    fn test_hash_count_floor_is_one() {
        // A very loose target would round k down to zero without the floor
        let params = calculate_optimal_parameters(1000, 0.9);
        assert_eq!(params.hash_count, 1);
    }

    #[test]
    fn test_hash_count_sizing_is_optimal_for_k() {
        let params = parameters_for_hash_count(10_000, 10);
        assert_eq!(params.hash_count, 10);
        assert_eq!(optimal_k(params.size_bits, 10_000), 10);
    }

    #[test]
    fn test_bits_grow_as_target_tightens() {
        let sizes: Vec<usize> = [0.1, 0.01, 0.001, 0.0001]
            .iter()
            .map(|p| minimum_bits(10_000, *p))
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] < w[1]), "{:?}", sizes);
    }

    #[test]
    fn test_fpr_from_fill() {
        assert_eq!(fpr_from_fill(0, 100, 3), 0.0);
        assert_eq!(fpr_from_fill(100, 100, 3), 1.0);
        assert!((fpr_from_fill(50, 100, 2) - 0.25).abs() < 1e-12);
    }
}
