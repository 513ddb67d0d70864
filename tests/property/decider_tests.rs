//! Property-based tests for outcome decisions

use proptest::prelude::*;

use pingpong::decider::{ErrorDecider, LatencyDecider, SeededSource, UniformSource, SAMPLE_RANGE};

use super::distribution_tests::{label_entries, partition_of_100};

proptest! {
    /// Every decision is one of the distribution's values
    #[test]
    fn test_decision_is_a_distribution_value(
        entries in label_entries(),
        n in 0.0f64..SAMPLE_RANGE,
    ) {
        let decider = ErrorDecider::parse(&entries.join(",")).unwrap();
        let decided = decider.decide_sample(n);
        prop_assert!(decider.distribution().values().any(|v| v == decided));
    }

    /// The first entry whose raw probability covers the sample wins
    #[test]
    fn test_decision_is_first_covering_entry(
        entries in label_entries(),
        n in 0.0f64..SAMPLE_RANGE,
    ) {
        let decider = ErrorDecider::parse(&entries.join(",")).unwrap();
        let entries = decider.distribution().entries();

        let expected = entries
            .iter()
            .find(|e| n <= e.probability)
            .unwrap_or(&entries[entries.len() - 1]);
        prop_assert_eq!(decider.decide_sample(n), &expected.value);
    }

    /// Samples above every probability fall back to the last entry
    #[test]
    fn test_fallback_above_every_probability(parts in partition_of_100()) {
        prop_assume!(parts.len() > 1);
        let encoded: Vec<String> = parts
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}%{}ms", p, i + 1))
            .collect();
        let decider = LatencyDecider::parse(&encoded.join(",")).unwrap();

        let max = decider
            .distribution()
            .probabilities()
            .fold(0.0f64, f64::max);
        prop_assume!(max < 99.5);

        let fallback = decider.distribution().fallback().value;
        prop_assert_eq!(*decider.decide_sample(99.9), fallback);
    }

    /// Equal seeds give equal decision sequences
    #[test]
    fn test_seeded_decisions_are_reproducible(entries in label_entries(), seed in any::<u64>()) {
        let decider = ErrorDecider::parse(&entries.join(",")).unwrap();
        let a = SeededSource::with_seed(seed);
        let b = SeededSource::with_seed(seed);

        for _ in 0..32 {
            let sample = a.sample();
            prop_assert!((0.0..SAMPLE_RANGE).contains(&sample));
            prop_assert_eq!(decider.decide_sample(sample), decider.decide(&b));
        }
    }
}
