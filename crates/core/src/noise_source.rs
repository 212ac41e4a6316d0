//! Seeded 3D coherent noise normalized to [0, 1].
//!
//! [`NoiseSource`] is the narrow interface the vector field consumes. The
//! default implementations wrap the `noise` crate's Perlin and OpenSimplex
//! generators, whose raw output lies roughly in [-1, 1], and remap it.
//!
//! All implementations are deterministic: same seed and coordinates give the
//! same value.

use noise::{NoiseFn, OpenSimplex, Perlin};
use serde::{Deserialize, Serialize};

/// A seedable 3D noise primitive returning values in [0, 1].
pub trait NoiseSource {
    /// Reseeds the generator. Subsequent samples depend only on `seed` and
    /// the coordinates.
    fn seed(&mut self, seed: u32);

    /// Samples the noise at `(x, y, z)`.
    fn noise(&self, x: f64, y: f64, z: f64) -> f64;
}

/// Which coherent-noise algorithm backs a noise-sourced field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    #[default]
    Perlin,
    Simplex,
}

impl NoiseKind {
    /// Parses a kind name, case-sensitive. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "perlin" => Some(NoiseKind::Perlin),
            "simplex" => Some(NoiseKind::Simplex),
            _ => None,
        }
    }

    /// Builds a boxed generator of this kind.
    pub fn build(self, seed: u32) -> Box<dyn NoiseSource> {
        match self {
            NoiseKind::Perlin => Box::new(PerlinNoise::new(seed)),
            NoiseKind::Simplex => Box::new(SimplexNoise::new(seed)),
        }
    }
}

/// Perlin noise remapped to [0, 1].
pub struct PerlinNoise {
    noise: Perlin,
}

/// OpenSimplex noise remapped to [0, 1].
pub struct SimplexNoise {
    noise: OpenSimplex,
}

impl PerlinNoise {
    /// Creates a Perlin generator seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
        }
    }
}

impl SimplexNoise {
    /// Creates an OpenSimplex generator seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            noise: OpenSimplex::new(seed),
        }
    }
}

/// Maps raw generator output from [-1, 1] to [0, 1], clamping overshoot.
fn to_unit(raw: f64) -> f64 {
    ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
}

impl NoiseSource for PerlinNoise {
    fn seed(&mut self, seed: u32) {
        self.noise = Perlin::new(seed);
    }

    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        to_unit(self.noise.get([x, y, z]))
    }
}

impl NoiseSource for SimplexNoise {
    fn seed(&mut self, seed: u32) {
        self.noise = OpenSimplex::new(seed);
    }

    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        to_unit(self.noise.get([x, y, z]))
    }
}

impl NoiseSource for Box<dyn NoiseSource> {
    fn seed(&mut self, seed: u32) {
        (**self).seed(seed);
    }

    fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).noise(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_unit_maps_endpoints() {
        assert_eq!(to_unit(-1.0), 0.0);
        assert_eq!(to_unit(1.0), 1.0);
        assert!((to_unit(0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn to_unit_clamps_overshoot() {
        assert_eq!(to_unit(-1.5), 0.0);
        assert_eq!(to_unit(1.5), 1.0);
    }

    #[test]
    fn perlin_is_deterministic_for_same_seed() {
        let a = PerlinNoise::new(42);
        let b = PerlinNoise::new(42);
        for i in 0..50 {
            let t = i as f64 * 0.137;
            assert_eq!(
                a.noise(t, t * 0.5, t * 0.25).to_bits(),
                b.noise(t, t * 0.5, t * 0.25).to_bits()
            );
        }
    }

    #[test]
    fn reseeding_matches_fresh_generator() {
        let mut reseeded = PerlinNoise::new(1);
        reseeded.seed(99);
        let fresh = PerlinNoise::new(99);
        assert_eq!(
            reseeded.noise(0.3, 1.7, 2.2).to_bits(),
            fresh.noise(0.3, 1.7, 2.2).to_bits()
        );
    }

    #[test]
    fn different_seeds_diverge_somewhere() {
        let a = PerlinNoise::new(1);
        let b = PerlinNoise::new(2);
        let differs = (0..100).any(|i| {
            let t = i as f64 * 0.31 + 0.05;
            a.noise(t, t, t) != b.noise(t, t, t)
        });
        assert!(differs, "seeds 1 and 2 produced identical samples");
    }

    #[test]
    fn noise_kind_from_name() {
        assert_eq!(NoiseKind::from_name("perlin"), Some(NoiseKind::Perlin));
        assert_eq!(NoiseKind::from_name("simplex"), Some(NoiseKind::Simplex));
        assert_eq!(NoiseKind::from_name("worley"), None);
    }

    #[test]
    fn boxed_source_delegates() {
        let mut boxed = NoiseKind::Simplex.build(7);
        let direct = SimplexNoise::new(7);
        assert_eq!(
            boxed.noise(0.4, 0.9, 0.1).to_bits(),
            direct.noise(0.4, 0.9, 0.1).to_bits()
        );
        boxed.seed(8);
        let reseeded = SimplexNoise::new(8);
        assert_eq!(
            boxed.noise(0.4, 0.9, 0.1).to_bits(),
            reseeded.noise(0.4, 0.9, 0.1).to_bits()
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn any_coord() -> impl Strategy<Value = f64> {
            -1000.0_f64..1000.0
        }

        proptest! {
            #[test]
            fn samples_stay_in_unit_interval(
                seed: u32,
                x in any_coord(),
                y in any_coord(),
                z in any_coord(),
            ) {
                for kind in [NoiseKind::Perlin, NoiseKind::Simplex] {
                    let v = kind.build(seed).noise(x, y, z);
                    prop_assert!((0.0..=1.0).contains(&v), "{kind:?} gave {v}");
                }
            }
        }
    }
}
