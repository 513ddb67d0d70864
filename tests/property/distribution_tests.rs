//! Property-based tests for distribution parsing

use std::time::Duration;

use assert_matches::assert_matches;
use proptest::prelude::*;

use pingpong::distribution::{LabelDistribution, LatencyDistribution};
use pingpong::error::DistributionError;

/// Positive integer probabilities adding up to exactly 100.
pub fn partition_of_100() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::btree_set(1u32..100, 0..6).prop_map(|cuts| {
        let mut parts = Vec::with_capacity(cuts.len() + 1);
        let mut last = 0;
        for cut in cuts.into_iter().chain(std::iter::once(100)) {
            parts.push(cut - last);
            last = cut;
        }
        parts
    })
}

/// Encoded label entries whose probabilities add up to 100.
pub fn label_entries() -> impl Strategy<Value = Vec<String>> {
    partition_of_100().prop_flat_map(|parts| {
        let n = parts.len();
        proptest::collection::vec("[a-z_]{1,10}", n).prop_map(move |labels| {
            parts
                .iter()
                .zip(labels)
                .map(|(p, label)| format!("{}%{}", p, label))
                .collect()
        })
    })
}

proptest! {
    /// Any set of entries adding up to 100 parses, with every entry kept
    #[test]
    fn test_valid_distributions_parse(entries in label_entries()) {
        let encoded = entries.join(",");
        let dist = LabelDistribution::parse(&encoded).unwrap();

        prop_assert_eq!(dist.len(), entries.len());
        prop_assert_eq!(dist.probabilities().sum::<f64>(), 100.0);

        let mut expected = entries.clone();
        expected.sort();
        let stored: Vec<&str> = dist.entries().iter().map(|e| e.encoded()).collect();
        prop_assert_eq!(stored, expected);
    }

    /// Input order never changes the parsed distribution
    #[test]
    fn test_parse_ignores_entry_order(entries in label_entries()) {
        let forward = LabelDistribution::parse(&entries.join(",")).unwrap();
        let mut reversed = entries.clone();
        reversed.reverse();
        let backward = LabelDistribution::parse(&reversed.join(",")).unwrap();

        prop_assert_eq!(forward, backward);
    }

    /// Moving one percent off the total is rejected with the actual sum
    #[test]
    fn test_sum_off_by_one_is_rejected(parts in partition_of_100(), extra in prop::bool::ANY) {
        prop_assume!(parts.len() > 1);
        prop_assume!(extra || parts[0] > 1);
        let mut parts = parts;
        if extra {
            parts[0] += 1;
        } else {
            parts[0] -= 1;
        }

        let encoded: Vec<String> = parts
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}%v{}", p, i))
            .collect();
        let expected = if extra { 101.0 } else { 99.0 };

        let err = LabelDistribution::parse(&encoded.join(",")).unwrap_err();
        assert_matches!(err, DistributionError::ProbabilitySumMismatch { sum } if sum == expected);
    }

    /// Millisecond latencies keep their exact value
    #[test]
    fn test_latency_values_preserved(
        parts in partition_of_100(),
        millis in proptest::collection::vec(0u64..100_000, 6),
    ) {
        let encoded: Vec<String> = parts
            .iter()
            .zip(&millis)
            .map(|(p, ms)| format!("{}%{}ms", p, ms))
            .collect();
        let dist = LatencyDistribution::parse(&encoded.join(",")).unwrap();

        for entry in dist.entries() {
            let (_, raw) = entry.encoded().split_once('%').unwrap();
            let ms: u64 = raw.trim_end_matches("ms").parse().unwrap();
            prop_assert_eq!(entry.value, Duration::from_millis(ms));
        }
    }

    /// Entries without exactly one separator are malformed
    #[test]
    fn test_missing_separator_is_malformed(label in "[a-z]{1,10}", p in 1u32..100) {
        let err = LabelDistribution::parse(&format!("{}{}", p, label)).unwrap_err();
        assert_matches!(err, DistributionError::MalformedEntry { .. });

        let err = LabelDistribution::parse(&format!("{}%{}%{}", p, label, 100 - p)).unwrap_err();
        assert_matches!(err, DistributionError::MalformedEntry { .. });
    }

    /// Probabilities outside (0, 100] are rejected even if the sum is 100
    #[test]
    fn test_probability_out_of_range(over in 101u32..1000) {
        let under = over - 100;
        let encoded = format!("{}%a,-{}%b", over, under);
        let err = LabelDistribution::parse(&encoded).unwrap_err();
        assert_matches!(err, DistributionError::InvalidProbability { .. });
    }
}
