//! Deterministic value noise for small-scale hill variation.
//!
//! Pure function of `(seed, position)`, so the scalar and batch evaluators produce
//! the same perturbation for the same point.
use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hill noise settings. Output of [`HillNoise::sample`] lies in `[-amplitude, amplitude]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HillNoise {
    pub seed: u64,
    pub amplitude: f32,
    /// Lattice cells per world unit.
    pub frequency: f32,
}

impl Default for HillNoise {
    fn default() -> Self {
        Self {
            seed: 0,
            amplitude: 1.0,
            frequency: 0.05,
        }
    }
}

impl HillNoise {
    pub fn new(seed: u64, amplitude: f32, frequency: f32) -> Self {
        Self {
            seed,
            amplitude,
            frequency,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(Error::InvalidConfig(
                "hill noise amplitude must be finite and >= 0".into(),
            ));
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(Error::InvalidConfig(
                "hill noise frequency must be finite and > 0".into(),
            ));
        }
        Ok(())
    }

    /// Noise value at `p`, scaled by the amplitude.
    #[inline]
    pub fn sample(&self, p: Vec2) -> f32 {
        let q = p * self.frequency;
        self.amplitude * (value_noise(self.seed, q.x, q.y) * 2.0 - 1.0)
    }
}

/// Smoothly interpolated lattice noise in `[0, 1]`.
pub fn value_noise(seed: u64, x: f32, y: f32) -> f32 {
    let xf = x.floor();
    let yf = y.floor();
    let xi = xf as i32;
    let yi = yf as i32;
    let tx = fade(x - xf);
    let ty = fade(y - yf);

    let v00 = hash01(seed, xi, yi);
    let v10 = hash01(seed, xi.wrapping_add(1), yi);
    let v01 = hash01(seed, xi, yi.wrapping_add(1));
    let v11 = hash01(seed, xi.wrapping_add(1), yi.wrapping_add(1));

    let a = v00 + (v10 - v00) * tx;
    let b = v01 + (v11 - v01) * tx;
    a + (b - a) * ty
}

#[inline]
fn fade(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn hash01(seed: u64, x: i32, y: i32) -> f32 {
    (hash_u64(seed, x, y) >> 40) as f32 / (1u64 << 24) as f32
}

/// SplitMix-style integer hash of a lattice coordinate.
fn hash_u64(seed: u64, x: i32, y: i32) -> u64 {
    let mut v = seed
        ^ (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as i64 as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    v ^= v >> 30;
    v = v.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    v ^= v >> 27;
    v = v.wrapping_mul(0x94D0_49BB_1331_11EB);
    v ^ (v >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_noise_is_bounded_and_deterministic() {
        for i in 0..200 {
            let x = i as f32 * 0.37 - 30.0;
            let y = i as f32 * -0.91 + 12.0;
            let v = value_noise(7, x, y);
            assert!((0.0..=1.0).contains(&v), "{v}");
            assert_eq!(v, value_noise(7, x, y));
        }
    }

    #[test]
    fn lattice_points_match_hash() {
        assert_eq!(value_noise(3, 4.0, -2.0), hash01(3, 4, -2));
    }

    #[test]
    fn seeds_differ() {
        let differ = (0..16).any(|i| {
            let x = i as f32 + 0.5;
            value_noise(1, x, 0.25) != value_noise(2, x, 0.25)
        });
        assert!(differ);
    }

    #[test]
    fn sample_respects_amplitude() {
        let noise = HillNoise::new(11, 2.5, 0.1);
        for i in 0..100 {
            let p = Vec2::new(i as f32 * 3.1, i as f32 * -1.7);
            assert!(noise.sample(p).abs() <= 2.5);
        }
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(HillNoise::default().validate().is_ok());
        assert!(HillNoise::new(0, -1.0, 0.1).validate().is_err());
        assert!(HillNoise::new(0, 1.0, 0.0).validate().is_err());
        assert!(HillNoise::new(0, f32::NAN, 0.1).validate().is_err());
    }
}
