use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the uniform jitter mixed into the toy engine's outputs.
pub trait NoiseSource: Send {
    /// Next sample in `[0, 1)`.
    fn sample(&mut self) -> f64;
}

pub struct RandomNoise {
    rng: StdRng,
}

impl RandomNoise {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for RandomNoise {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Always returns the same value (clamped into `[0, 1)`).
pub struct ConstantNoise(pub f64);

impl NoiseSource for ConstantNoise {
    fn sample(&mut self) -> f64 {
        self.0.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

#[test]
fn test_seeded_noise_is_reproducible() {
    let mut a = RandomNoise::seeded(42);
    let mut b = RandomNoise::seeded(42);
    for _ in 0..16 {
        let x = a.sample();
        assert_eq!(x, b.sample());
        assert!((0.0..1.0).contains(&x));
    }
}
