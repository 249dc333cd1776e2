//! Adaptive strategy selection for pairwise joins and exclusions
//!
//! Two interchangeable algorithms exist for intersecting or subtracting
//! containers: probing the smaller side against the larger via point
//! lookups, or walking both ordered iterators in lock-step. The choice
//! is driven by a step-count estimate so it can be unit-tested against
//! the strategy-equivalence property.

/// Pairwise combination algorithm
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinStrategy {
    /// Point-lookup of the smaller container's keys in the larger one
    Probe,
    /// Lock-step walk of both ascending-ordered iterators
    Merge,
}

/// Bit length of `x` (number of shifts until zero)
fn log2(mut x: usize) -> usize {
    let mut l = 0;
    while x > 0 {
        x >>= 1;
        l += 1;
    }
    l
}

/// Pick the cheaper combination strategy for containers of the given
/// sizes. A full lock-step scan costs about `10 * (high + low - 1)`
/// steps; probing the smaller side costs about `12 * log2(high) * low`.
pub fn choose_strategy(size_a: usize, size_b: usize) -> JoinStrategy {
    let high = size_a.max(size_b);
    let low = size_a.min(size_b);
    let steps_enum = 10 * (high + low - 1);
    let steps_test = 12 * log2(high) * low;
    if steps_enum > steps_test {
        JoinStrategy::Probe
    } else {
        JoinStrategy::Merge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log2_bit_length() {
        assert_eq!(log2(1), 1);
        assert_eq!(log2(2), 2);
        assert_eq!(log2(1024), 11);
    }

    #[test]
    fn test_skewed_sizes_probe() {
        // tiny set against a huge one: point lookups win
        assert_eq!(choose_strategy(2, 1_000_000), JoinStrategy::Probe);
        assert_eq!(choose_strategy(1_000_000, 2), JoinStrategy::Probe);
    }

    #[test]
    fn test_similar_sizes_merge() {
        // similar sizes: the linear lock-step scan wins
        assert_eq!(choose_strategy(1000, 1000), JoinStrategy::Merge);
        assert_eq!(choose_strategy(1 << 20, 1 << 20), JoinStrategy::Merge);
    }

    #[test]
    fn test_symmetry() {
        for (a, b) in [(10, 500), (64, 64), (1, 7), (4096, 100)] {
            assert_eq!(choose_strategy(a, b), choose_strategy(b, a));
        }
    }
}
