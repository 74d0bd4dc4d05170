//! Randomized emit cadence.
//!
//! The pause before each publish is drawn from a normal distribution and
//! folded to non-negative with `abs`. With the default mean of 4.0s and
//! standard deviation of 0.8s that is a 20% relative jitter around the
//! target interval.
//!
//! [`JitterDelay`] is the shared, immutable description of the
//! distribution. Each emitter turns it into its own [`DelaySampler`],
//! which owns a private RNG, so emitters never contend on a generator.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::StreamError;

/// Distribution of the pause before each published record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterDelay {
    mean: f64,
    std_dev: f64,
}

impl JitterDelay {
    /// Default mean pause, in seconds.
    pub const DEFAULT_MEAN_SECS: f64 = 4.0;

    /// Default standard deviation of the pause, in seconds.
    pub const DEFAULT_STD_DEV_SECS: f64 = 0.8;

    /// Describe a pause of `|N(mean_secs, std_dev_secs)|` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidDelay`] if either parameter is
    /// negative or not finite.
    pub fn new(mean_secs: f64, std_dev_secs: f64) -> Result<Self, StreamError> {
        let invalid = |reason: &str| StreamError::InvalidDelay {
            mean: mean_secs,
            std_dev: std_dev_secs,
            reason: reason.to_owned(),
        };

        if !mean_secs.is_finite() || mean_secs < 0.0 {
            return Err(invalid("mean must be finite and non-negative"));
        }
        if !std_dev_secs.is_finite() || std_dev_secs < 0.0 {
            return Err(invalid("standard deviation must be finite and non-negative"));
        }
        Ok(Self {
            mean: mean_secs,
            std_dev: std_dev_secs,
        })
    }

    /// A delay with no jitter.
    pub const fn fixed(pause: Duration) -> Self {
        Self {
            mean: pause.as_secs_f64(),
            std_dev: 0.0,
        }
    }

    /// A sampler seeded from the thread-local RNG.
    pub fn sampler(&self) -> DelaySampler {
        DelaySampler {
            delay: *self,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// A sampler with a fixed seed, for reproducible cadences.
    pub fn seeded_sampler(&self, seed: u64) -> DelaySampler {
        DelaySampler {
            delay: *self,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for JitterDelay {
    fn default() -> Self {
        Self {
            mean: Self::DEFAULT_MEAN_SECS,
            std_dev: Self::DEFAULT_STD_DEV_SECS,
        }
    }
}

/// Per-emitter source of pauses. Owned by exactly one emitter task.
#[derive(Debug, Clone)]
pub struct DelaySampler {
    delay: JitterDelay,
    rng: StdRng,
}

impl DelaySampler {
    /// Draw the next pause.
    pub fn next_delay(&mut self) -> Duration {
        let z: f64 = StandardNormal.sample(&mut self.rng);
        let secs = self.delay.std_dev.mul_add(z, self.delay.mean).abs();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(JitterDelay::new(4.0, -0.1).is_err());
        assert!(JitterDelay::new(-1.0, 0.8).is_err());
        assert!(JitterDelay::new(f64::NAN, 0.8).is_err());
        assert!(JitterDelay::new(4.0, f64::INFINITY).is_err());
        assert!(JitterDelay::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn samples_are_never_negative() {
        // Mean zero makes half of the raw draws negative before folding.
        let delay = JitterDelay::new(0.0, 1.0).unwrap_or_default();
        let mut sampler = delay.seeded_sampler(7);
        for _ in 0..1_000 {
            assert!(sampler.next_delay() >= Duration::ZERO);
        }
    }

    #[test]
    fn default_sample_mean_is_near_four_seconds() {
        let mut sampler = JitterDelay::default().seeded_sampler(42);
        let total: Duration = (0..2_000).map(|_| sampler.next_delay()).sum();
        let mean = total.as_secs_f64() / 2_000.0;
        assert!((3.8..4.2).contains(&mean), "sample mean {mean} drifted");
    }

    #[test]
    fn fixed_delay_has_no_jitter() {
        let mut sampler = JitterDelay::fixed(Duration::from_millis(250)).sampler();
        for _ in 0..10 {
            assert_eq!(sampler.next_delay(), Duration::from_millis(250));
        }
    }

    #[test]
    fn same_seed_same_cadence() {
        let delay = JitterDelay::default();
        let a: Vec<Duration> = {
            let mut s = delay.seeded_sampler(9);
            (0..5).map(|_| s.next_delay()).collect()
        };
        let b: Vec<Duration> = {
            let mut s = delay.seeded_sampler(9);
            (0..5).map(|_| s.next_delay()).collect()
        };
        assert_eq!(a, b);
    }
}
