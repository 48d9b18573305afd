//! Single injectable randomness seam for the kernel.

use rand::{Rng, RngCore};

/// Source of uniform samples in `[0, 1)`; every stochastic decision in the
/// kernel goes through one of these.
///
/// Implemented for every [`RngCore`], so a seeded `SmallRng` plugs in
/// directly. Tests supply scripted sources to force outcomes.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform sample in `[min, max)`.
    fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_unit() * (max - min)
    }

    /// Bernoulli draw succeeding with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Uniform integer in `0..n`; returns 0 when `n` is 0.
    fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let value = (self.next_unit() * f64::from(n)).floor() as u32;
        value.min(n - 1)
    }

    /// Normal sample via Box-Muller.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u = 1.0 - self.next_unit();
        let v = self.next_unit();
        let z = (-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos();
        z * std_dev + mean
    }
}

impl<R: RngCore> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Scripted;
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn seeded_rng_stays_in_unit_interval() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let value = rng.next_unit();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn below_never_reaches_upper_bound() {
        let mut source = Scripted::constant(0.999_999_999);
        assert_eq!(source.below(5), 4);
        assert_eq!(source.below(0), 0);
        let mut source = Scripted::constant(0.0);
        assert_eq!(source.below(5), 0);
    }

    #[test]
    fn range_and_chance_follow_the_sample() {
        let mut source = Scripted::new(&[0.5, 0.25, 0.75]);
        assert!((source.range(10.0, 20.0) - 15.0).abs() < 1e-12);
        assert!(source.chance(0.3));
        assert!(!source.chance(0.3));
    }

    #[test]
    fn normal_is_finite_for_edge_samples() {
        let mut source = Scripted::new(&[0.0, 0.0]);
        assert!(source.normal(0.0, 0.01).is_finite());
    }
}
