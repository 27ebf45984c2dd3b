//! Noise generation module for terrain synthesis.
//!
//! Uses Perlin noise from the `noise` crate summed over several octaves.

mod fractal;

pub use fractal::{generate_noise, generate_noise_with_rng, NoiseParams, NormalizeMode, MIN_SCALE};
