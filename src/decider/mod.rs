//! Outcome decider
//!
//! Maps a uniform sample in `[0, 100)` to one entry of a weighted
//! distribution.
//!
//! The scan compares the sample against each entry's *raw* probability in
//! stored order and picks the first entry whose probability is at least the
//! sample. It does not accumulate probabilities, so it is not a true
//! cumulative partition: for `50%timeout,30%connection,20%deadlock` the
//! stored order is `deadlock, connection, timeout` and a sample of 25 selects
//! `connection`, while a sample above 50 falls through to the last entry.
//! Dashboards built against this simulator are calibrated to that skew, so it
//! is kept as is.

mod sampler;

pub use sampler::*;

use std::time::Duration;

use crate::distribution::{BucketValue, Distribution};
use crate::error::DistributionError;

/// Picks outcomes from an immutable distribution.
///
/// Deciders hold no mutable state and can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct OutcomeDecider<T> {
    distribution: Distribution<T>,
}

/// Decides how long a simulated operation waits
pub type LatencyDecider = OutcomeDecider<Duration>;

/// Decides which error category a failed operation reports
pub type ErrorDecider = OutcomeDecider<String>;

impl<T: BucketValue> OutcomeDecider<T> {
    pub fn new(distribution: Distribution<T>) -> Self {
        Self { distribution }
    }

    /// Parse an encoded distribution and build a decider for it
    pub fn parse(encoded: &str) -> Result<Self, DistributionError> {
        Distribution::parse(encoded).map(Self::new)
    }

    pub fn distribution(&self) -> &Distribution<T> {
        &self.distribution
    }

    /// Draw a sample from `source` and return the selected value.
    pub fn decide(&self, source: &dyn UniformSource) -> &T {
        self.decide_sample(source.sample())
    }

    /// Return the value selected by a given sample.
    pub fn decide_sample(&self, n: f64) -> &T {
        let entry = self
            .distribution
            .entries()
            .iter()
            .find(|entry| n <= entry.probability)
            .unwrap_or_else(|| self.distribution.fallback());
        &entry.value
    }
}
