//! Hyperparameter distributions
//!
//! A distribution is either an enumerated finite set of values, sampled
//! uniformly, or any object implementing [`ParamSampler`].

use super::params::ParamValue;
use crate::error::{MetaModelError, Result};
use rand::{Rng, RngCore};
use std::fmt;
use std::sync::Arc;

/// Capability to draw one hyperparameter value from a random source
pub trait ParamSampler: Send + Sync + fmt::Debug {
    /// Draw a value
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue;

    /// Check the sampler's own parameters
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Distribution of a single hyperparameter
#[derive(Debug, Clone)]
pub enum ParamDistribution {
    /// Finite set; one element drawn uniformly
    Enumerated(Vec<ParamValue>),
    /// Arbitrary sampler
    Sampleable(Arc<dyn ParamSampler>),
}

impl ParamDistribution {
    /// Enumerated distribution from anything convertible to values
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        ParamDistribution::Enumerated(values.into_iter().map(Into::into).collect())
    }

    /// Wrap a sampler
    pub fn sampler(sampler: impl ParamSampler + 'static) -> Self {
        ParamDistribution::Sampleable(Arc::new(sampler))
    }

    /// Draw one value
    pub fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        match self {
            ParamDistribution::Enumerated(values) => {
                let idx = rng.gen_range(0..values.len());
                values[idx].clone()
            }
            ParamDistribution::Sampleable(sampler) => sampler.sample(rng),
        }
    }

    /// Fails for an empty enumerated set or an invalid sampler
    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            ParamDistribution::Enumerated(values) if values.is_empty() => Err(MetaModelError::ConfigError(
                format!("distribution for '{}' has no values", name),
            )),
            ParamDistribution::Enumerated(_) => Ok(()),
            ParamDistribution::Sampleable(sampler) => sampler.validate().map_err(|e| {
                MetaModelError::ConfigError(format!("distribution for '{}': {}", name, e))
            }),
        }
    }
}

/// Continuous uniform distribution over `[low, high)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    pub low: f64,
    pub high: f64,
}

impl Uniform {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl ParamSampler for Uniform {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        ParamValue::Float(rng.gen::<f64>() * (self.high - self.low) + self.low)
    }

    fn validate(&self) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low >= self.high {
            return Err(MetaModelError::ConfigError(format!(
                "uniform bounds must satisfy low < high, got [{}, {})",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Log-uniform distribution over `[low, high)`, both bounds positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogUniform {
    pub low: f64,
    pub high: f64,
}

impl LogUniform {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl ParamSampler for LogUniform {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        let log_low = self.low.ln();
        let log_high = self.high.ln();
        ParamValue::Float((rng.gen::<f64>() * (log_high - log_low) + log_low).exp())
    }

    fn validate(&self) -> Result<()> {
        if !(self.low > 0.0 && self.high.is_finite()) || self.low >= self.high {
            return Err(MetaModelError::ConfigError(format!(
                "log-uniform bounds must satisfy 0 < low < high, got [{}, {})",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Uniform integers in `[low, high)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandInt {
    pub low: i64,
    pub high: i64,
}

impl RandInt {
    pub fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }
}

impl ParamSampler for RandInt {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        ParamValue::Int(rng.gen_range(self.low..self.high))
    }

    fn validate(&self) -> Result<()> {
        if self.low >= self.high {
            return Err(MetaModelError::ConfigError(format!(
                "randint bounds must satisfy low < high, got [{}, {})",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Sampler for small integer vectors such as MLP hidden layer widths.
///
/// With probability [`BoundedIntVector::SATURATION_PROB`] a draw returns the
/// constant vector `[high; dimension]`; otherwise it returns `dimension`
/// independent uniform integers in `[low, high)`. The bias towards the
/// largest (most complex) configuration is intentional: a purely uniform
/// draw over `[low, high)` can never reach `high` itself, and the widest
/// network is the one most worth trying at least a few times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedIntVector {
    pub low: i64,
    pub high: i64,
    pub dimension: usize,
}

impl BoundedIntVector {
    /// Probability of returning the saturated vector `[high; dimension]`
    pub const SATURATION_PROB: f64 = 0.10;

    pub fn new(low: i64, high: i64, dimension: usize) -> Self {
        Self { low, high, dimension }
    }

    /// Draw a vector
    pub fn draw(&self, rng: &mut dyn RngCore) -> Vec<i64> {
        if rng.gen::<f64>() < Self::SATURATION_PROB {
            vec![self.high; self.dimension]
        } else {
            (0..self.dimension)
                .map(|_| rng.gen_range(self.low..self.high))
                .collect()
        }
    }
}

impl ParamSampler for BoundedIntVector {
    fn sample(&self, rng: &mut dyn RngCore) -> ParamValue {
        ParamValue::IntVec(self.draw(rng))
    }

    fn validate(&self) -> Result<()> {
        if self.low >= self.high {
            return Err(MetaModelError::ConfigError(format!(
                "int vector bounds must satisfy low < high, got [{}, {})",
                self.low, self.high
            )));
        }
        if self.dimension == 0 {
            return Err(MetaModelError::ConfigError(
                "int vector dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_enumerated_stays_in_set() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let dist = ParamDistribution::values(["gini", "entropy"]);
        for _ in 0..500 {
            let v = dist.sample(&mut rng);
            assert!(v == ParamValue::from("gini") || v == ParamValue::from("entropy"));
        }
    }

    #[test]
    fn test_empty_enumerated_rejected() {
        let dist = ParamDistribution::Enumerated(Vec::new());
        assert!(matches!(dist.validate("alpha"), Err(MetaModelError::ConfigError(_))));
    }

    #[test]
    fn test_bad_bounds_rejected() {
        assert!(ParamDistribution::sampler(Uniform::new(1.0, 1.0)).validate("a").is_err());
        assert!(ParamDistribution::sampler(LogUniform::new(0.0, 1.0)).validate("a").is_err());
        assert!(ParamDistribution::sampler(RandInt::new(5, 2)).validate("a").is_err());
        assert!(ParamDistribution::sampler(BoundedIntVector::new(0, 5, 0)).validate("a").is_err());
        assert!(ParamDistribution::sampler(RandInt::new(1, 2)).validate("a").is_ok());
    }

    #[test]
    fn test_uniform_and_log_uniform_in_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let uniform = Uniform::new(-2.0, 3.0);
        let log_uniform = LogUniform::new(1e-4, 1e-1);
        for _ in 0..1000 {
            let u = uniform.sample(&mut rng).as_float().unwrap();
            assert!((-2.0..3.0).contains(&u));
            let l = log_uniform.sample(&mut rng).as_float().unwrap();
            assert!(l >= 1e-4 && l <= 1e-1);
        }
    }

    #[test]
    fn test_randint_half_open() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let dist = RandInt::new(3, 6);
        let mut seen = [false; 3];
        for _ in 0..1000 {
            let v = dist.sample(&mut rng).as_int().unwrap();
            assert!((3..6).contains(&v));
            seen[(v - 3) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_bounded_int_vector_saturation_rate() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
        let sampler = BoundedIntVector::new(0, 5, 3);
        let n_draws = 20_000;

        let mut saturated = 0usize;
        let mut counts = [0usize; 5];
        for _ in 0..n_draws {
            let v = sampler.draw(&mut rng);
            assert_eq!(v.len(), 3);
            if v == vec![5, 5, 5] {
                saturated += 1;
            } else {
                for &c in &v {
                    assert!((0..5).contains(&c), "coordinate {} out of [0, 5)", c);
                    counts[c as usize] += 1;
                }
            }
        }

        let rate = saturated as f64 / n_draws as f64;
        assert!((rate - 0.10).abs() < 0.015, "saturation rate {}", rate);

        // Remaining coordinates are uniform over {0..4}
        let total: usize = counts.iter().sum();
        for &c in &counts {
            let p = c as f64 / total as f64;
            assert!((p - 0.2).abs() < 0.015, "coordinate frequency {}", p);
        }
    }
}
