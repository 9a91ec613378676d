use rand::prelude::*;
use rand_distr::StandardNormal;

/// Random source for the transport engine.
///
/// Wraps a ChaCha-based `StdRng` seeded from the operating system. Runs are
/// not reproducible; [`RandomDistribution::seeded`] exists for tests.
#[derive(Debug, Clone)]
pub struct RandomDistribution {
    rng: StdRng,
}

impl Default for RandomDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomDistribution {
    pub fn new() -> Self {
        RandomDistribution { rng: StdRng::from_os_rng() }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomDistribution { rng: StdRng::seed_from_u64(seed) }
    }

    /// Independent generator seeded from this one, for a child simulation.
    pub fn fork(&mut self) -> Self {
        RandomDistribution { rng: StdRng::from_rng(&mut self.rng) }
    }

    fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * sigma + mean
    }

    /// Normal draw floored at zero, for physical sizes and depths.
    pub fn sample(&mut self, mean: f64, sigma: f64) -> f64 {
        self.gaussian(mean, sigma).max(0.0)
    }

    /// Signed deviation of a normal draw from its mean. Never clamped.
    pub fn scatter_offset(&mut self, mean: f64, sigma: f64) -> f64 {
        self.gaussian(mean, sigma) - mean
    }

    /// Uniform value in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Uniform `f32` in `[0, 1)`, used for distribution selection.
    pub fn uniform_f32(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Independent coin flip that succeeds with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.uniform() < p as f64
    }

    /// Uniform value in `[min, max)`; returns `min` for an empty range.
    pub fn between(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.uniform() * (max - min) + min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_samples_are_never_negative() {
        let mut dist = RandomDistribution::seeded(11);
        for _ in 0..10_000 {
            assert!(dist.sample(1.0, 5.0) >= 0.0);
        }
        // Mean far below zero collapses to the floor.
        assert_eq!(dist.sample(-1000.0, 1.0), 0.0);
    }

    #[test]
    fn scatter_offset_is_signed_and_centered() {
        let mut dist = RandomDistribution::seeded(7);
        let n = 20_000;
        let mut sum = 0.0;
        let mut negatives = 0;
        for _ in 0..n {
            let v = dist.scatter_offset(-100.0, 25.0);
            sum += v;
            if v < 0.0 {
                negatives += 1;
            }
        }
        let mean = sum / n as f64;
        assert!(mean.abs() < 1.5, "mean offset {mean}");
        assert!(negatives > n / 3 && negatives < 2 * n / 3);
    }

    #[test]
    fn zero_sigma_is_deterministic() {
        let mut dist = RandomDistribution::seeded(3);
        assert_eq!(dist.sample(42.0, 0.0), 42.0);
        assert_eq!(dist.scatter_offset(100.0, 0.0), 0.0);
    }

    #[test]
    fn chance_extremes() {
        let mut dist = RandomDistribution::seeded(5);
        for _ in 0..1000 {
            assert!(dist.chance(1.0));
            assert!(!dist.chance(0.0));
        }
    }

    #[test]
    fn between_stays_in_range() {
        let mut dist = RandomDistribution::seeded(9);
        for _ in 0..1000 {
            let v = dist.between(270.0, 360.0);
            assert!((270.0..360.0).contains(&v));
        }
        assert_eq!(dist.between(300.0, 300.0), 300.0);
    }
}
