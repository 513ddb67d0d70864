//! Weighted distributions
//!
//! Parses the compact `<probability>%<value>,<probability>%<value>,...`
//! encoding used for latency and error-type settings into an immutable,
//! validated list of weighted entries.
//!
//! Entries are stored sorted by their encoded text, not by probability or
//! value. The outcome decider scans them in that order, so the sort is part
//! of the observable behavior.

mod duration;

pub use duration::{format_duration, parse_duration};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DistributionError;

/// The probabilities of a distribution must add up to exactly this value.
pub const TOTAL_PROBABILITY: f64 = 100.0;

/// A value that can appear on the right-hand side of a weighted entry.
pub trait BucketValue: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Short name used in log events.
    const KIND: &'static str;

    /// Parse the value part of an encoded entry.
    fn parse_value(raw: &str) -> Result<Self, String>;

    /// Encode the value back into its textual form.
    fn encode(&self) -> String;
}

impl BucketValue for Duration {
    const KIND: &'static str = "latency";

    fn parse_value(raw: &str) -> Result<Self, String> {
        parse_duration(raw)
    }

    fn encode(&self) -> String {
        format_duration(*self)
    }
}

impl BucketValue for String {
    const KIND: &'static str = "label";

    fn parse_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }

    fn encode(&self) -> String {
        self.clone()
    }
}

/// One `(probability, value)` pair of a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedEntry<T> {
    /// Raw probability in percent, as written in the encoded entry
    pub probability: f64,
    /// The outcome selected by this entry
    pub value: T,
    encoded: String,
}

impl<T> WeightedEntry<T> {
    /// The entry exactly as it appeared in the input.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// A validated, immutable weighted distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<T> {
    entries: Vec<WeightedEntry<T>>,
}

/// Distribution of wait durations
pub type LatencyDistribution = Distribution<Duration>;

/// Distribution of free-form labels, such as error categories
pub type LabelDistribution = Distribution<String>;

impl<T: BucketValue> Distribution<T> {
    /// Parse an encoded distribution.
    ///
    /// Every entry must be `<probability>%<value>` with a probability in
    /// `(0, 100]`, and the probabilities must add up to exactly 100.
    pub fn parse(encoded: &str) -> Result<Self, DistributionError> {
        let mut raw_entries: Vec<&str> = encoded.split(',').collect();
        raw_entries.sort_unstable();

        let mut total = 0.0;
        let mut entries = Vec::with_capacity(raw_entries.len());
        for raw in raw_entries {
            let fields: Vec<&str> = raw.split('%').collect();
            let [probability_text, value] = fields[..] else {
                return Err(DistributionError::MalformedEntry {
                    input: encoded.to_string(),
                    entry: raw.to_string(),
                });
            };

            let invalid_probability = |reason: String| DistributionError::InvalidProbability {
                value: probability_text.to_string(),
                reason,
            };
            let probability: f64 = probability_text
                .parse()
                .map_err(|e: std::num::ParseFloatError| invalid_probability(e.to_string()))?;
            if !(probability > 0.0 && probability <= TOTAL_PROBABILITY) {
                return Err(invalid_probability(
                    "probability must be in (0, 100]".to_string(),
                ));
            }
            total += probability;

            let value = T::parse_value(value).map_err(|reason| DistributionError::InvalidValue {
                value: value.to_string(),
                reason,
            })?;

            entries.push(WeightedEntry {
                probability,
                value,
                encoded: raw.to_string(),
            });
        }

        if total != TOTAL_PROBABILITY {
            return Err(DistributionError::ProbabilitySumMismatch { sum: total });
        }

        let distribution = Self { entries };
        tracing::info!(
            kind = T::KIND,
            values = ?distribution.values().collect::<Vec<_>>(),
            probabilities = ?distribution.probabilities().collect::<Vec<_>>(),
            "Weighted distribution created"
        );
        Ok(distribution)
    }

    /// Entries in stored (sorted) order
    pub fn entries(&self) -> &[WeightedEntry<T>] {
        &self.entries
    }

    /// Number of entries; never zero
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn probabilities(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|e| e.probability)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|e| &e.value)
    }

    /// The entry returned when a sample exceeds every raw probability.
    pub fn fallback(&self) -> &WeightedEntry<T> {
        // Parsing always yields at least one entry.
        &self.entries[self.entries.len() - 1]
    }
}

impl<T: BucketValue> FromStr for Distribution<T> {
    type Err = DistributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<T: BucketValue> fmt::Display for Distribution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}%{}", entry.probability, entry.value.encode())?;
        }
        Ok(())
    }
}
