//! Uniform sample sources

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution as _, Uniform};

/// Upper bound (exclusive) of every sample, in percent.
pub const SAMPLE_RANGE: f64 = 100.0;

/// A source of uniform samples in `[0, 100)`.
///
/// Implementations are shared by every concurrent simulation, so they take
/// `&self`.
pub trait UniformSource: Send + Sync {
    fn sample(&self) -> f64;
}

fn percent() -> Uniform<f64> {
    Uniform::new(0.0, SAMPLE_RANGE)
}

/// Draws from the thread-local RNG. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl UniformSource for ThreadRngSource {
    fn sample(&self) -> f64 {
        percent().sample(&mut rand::thread_rng())
    }
}

/// Reproducible source backed by a seeded [`StdRng`]
pub struct SeededSource {
    rng: Mutex<StdRng>,
    range: Uniform<f64>,
}

impl SeededSource {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            range: percent(),
        }
    }
}

impl UniformSource for SeededSource {
    fn sample(&self) -> f64 {
        self.range.sample(&mut *self.rng.lock())
    }
}

/// Always returns the same sample.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl UniformSource for FixedSource {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Pick a seeded source when a seed is configured, the thread RNG otherwise.
pub fn source_for_seed(seed: Option<u64>) -> Arc<dyn UniformSource> {
    match seed {
        Some(seed) => Arc::new(SeededSource::with_seed(seed)),
        None => Arc::new(ThreadRngSource),
    }
}
