//! Injectable randomness
//!
//! Every stochastic step (AQI wiggle and spikes, per-hour jitter, live drift)
//! draws from a [`NoiseSource`] so the deterministic parts of the pipeline can
//! be tested with a seeded or fixed source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform noise
pub trait NoiseSource: Send {
    /// Uniform sample in `[low, high)`; returns `low` when the range is empty
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// Uniform sample in `[-amplitude, amplitude]`
    fn symmetric(&mut self, amplitude: f64) -> f64 {
        self.uniform(-amplitude, amplitude)
    }

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool;
}

/// Noise backed by a `rand` generator
pub struct RngNoise<R: Rng + Send> {
    rng: R,
}

impl RngNoise<StdRng> {
    /// Fresh entropy-seeded source
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible source
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng + Send> RngNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> NoiseSource for RngNoise<R> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Deterministic noise: every sample sits at a fixed position of its range
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise {
    /// Position within each range, -1.0 = low end, 0.0 = centre, 1.0 = high end
    pub position: f64,
    /// Outcome of every `chance` draw
    pub hit: bool,
}

impl FixedNoise {
    /// Centre of every range, no chance events
    pub fn centered() -> Self {
        Self {
            position: 0.0,
            hit: false,
        }
    }

    pub fn new(position: f64, hit: bool) -> Self {
        Self {
            position: position.clamp(-1.0, 1.0),
            hit,
        }
    }
}

impl NoiseSource for FixedNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let mid = (low + high) / 2.0;
        let half = (high - low) / 2.0;
        mid + half * self.position
    }

    fn chance(&mut self, _p: f64) -> bool {
        self.hit
    }
}
