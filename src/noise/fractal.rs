//! Multi-octave fractal noise heightmaps.

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;
use crate::terrain::HeightGrid;
use crate::{seeded_rng, SimRng};

/// Scale used in place of a non-positive `scale`.
pub const MIN_SCALE: f32 = 0.000_01;

/// Range of the per-octave random offsets, so tiled octaves never line up.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// How raw octave sums are mapped to heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Rescale by the observed min/max of this grid. Output spans exactly `[0, 1]`.
    #[default]
    Local,
    /// Rescale by the theoretical amplitude sum. Adjacent tiles share the constant, so
    /// their edges line up; values are not clamped and may slightly leave `[0, 1]`.
    Global,
}

/// Configuration for fractal noise generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Number of noise layers (>= 1).
    pub octaves: u32,
    /// Amplitude multiplier per octave, in `[0, 1]`.
    pub persistence: f32,
    /// Frequency multiplier per octave (>= 1).
    pub lacunarity: f32,
    /// Feature size in cells. Larger values give smoother terrain.
    pub scale: f32,
    /// Sampling window offset in cells: `x` shifts columns, `y` shifts rows.
    ///
    /// The offset is added to the sample position, so the tile to the right of a
    /// `width`-wide tile starts at `offset.x + width - 1` and shares its last column.
    pub offset: Vec2,
    pub normalize: NormalizeMode,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 5,
            persistence: 0.411,
            lacunarity: 2.51,
            scale: 50.0,
            offset: Vec2::ZERO,
            normalize: NormalizeMode::Local,
        }
    }
}

impl NoiseParams {
    /// Smooth rolling hills, suitable for quick previews.
    pub fn rolling_hills() -> Self {
        Self {
            octaves: 4,
            persistence: 0.45,
            lacunarity: 2.0,
            scale: 80.0,
            ..Default::default()
        }
    }

    /// Returns a copy with every field forced into its valid range.
    pub fn sanitized(&self) -> Self {
        let scale = if self.scale <= 0.0 {
            log::warn!("noise scale {} is not positive, using {}", self.scale, MIN_SCALE);
            MIN_SCALE
        } else {
            self.scale
        };
        Self {
            octaves: self.octaves.max(1),
            persistence: self.persistence.clamp(0.0, 1.0),
            lacunarity: self.lacunarity.max(1.0),
            scale,
            offset: self.offset,
            normalize: self.normalize,
        }
    }

    /// Sum of octave amplitudes: the largest magnitude a raw sample can reach.
    pub fn max_possible_height(&self) -> f32 {
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for _ in 0..self.octaves.max(1) {
            total += amplitude;
            amplitude *= self.persistence;
        }
        total
    }
}

/// Generates a `width`×`height` heightmap from a fresh stream seeded with `seed`.
pub fn generate_noise(
    width: usize,
    height: usize,
    seed: u64,
    params: &NoiseParams,
) -> Result<HeightGrid, TerrainError> {
    let mut rng = seeded_rng(seed);
    generate_noise_with_rng(width, height, params, &mut rng)
}

/// Generates a heightmap, drawing the noise permutation seed and the per-octave offsets
/// from `rng`.
pub fn generate_noise_with_rng(
    width: usize,
    height: usize,
    params: &NoiseParams,
    rng: &mut SimRng,
) -> Result<HeightGrid, TerrainError> {
    let mut grid = HeightGrid::new(width, height)?;
    let params = params.sanitized();

    let perlin = Perlin::new(rng.random());
    let octave_offsets = draw_octave_offsets(&params, rng);

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;

    grid.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(x, row)| {
            for (y, cell) in row.iter_mut().enumerate() {
                let col = y as f32 - half_width;
                let row = x as f32 - half_height;
                *cell = octave_sum(&perlin, &octave_offsets, &params, col, row);
            }
        });

    match params.normalize {
        NormalizeMode::Local => {
            let (min, max) = grid.value_range();
            for h in grid.as_mut_slice() {
                *h = inverse_lerp(min, max, *h);
            }
        }
        NormalizeMode::Global => {
            let max_possible = params.max_possible_height();
            for h in grid.as_mut_slice() {
                *h = (*h + 1.0) / (2.0 * max_possible);
            }
        }
    }

    Ok(grid)
}

/// One random offset per octave, shifted by the user offset.
fn draw_octave_offsets(params: &NoiseParams, rng: &mut SimRng) -> Vec<Vec2> {
    (0..params.octaves)
        .map(|_| {
            let ox = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            let oy = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            Vec2::new(ox, oy) + params.offset
        })
        .collect()
}

/// Raw octave sum at a centred cell position, in `[-max_possible, max_possible]`.
fn octave_sum(perlin: &Perlin, offsets: &[Vec2], params: &NoiseParams, col: f32, row: f32) -> f32 {
    let scale = params.scale as f64;
    let mut amplitude = 1.0f64;
    let mut frequency = 1.0f64;
    let mut total = 0.0f64;

    for offset in offsets {
        let sample_col = (col + offset.x) as f64 / scale * frequency;
        let sample_row = (row + offset.y) as f64 / scale * frequency;
        total += perlin.get([sample_col, sample_row]) * amplitude;

        amplitude *= params.persistence as f64;
        frequency *= params.lacunarity as f64;
    }

    total as f32
}

/// Position of `value` between `a` and `b` as a fraction in `[0, 1]`; `0` when `a == b`.
fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        0.0
    } else {
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let params = NoiseParams::default();
        assert_eq!(params.octaves, 5);
        assert_eq!(params.normalize, NormalizeMode::Local);
        assert!(params.persistence > 0.0 && params.persistence < 1.0);
    }

    #[test]
    fn test_sanitize_corrects_scale_and_ranges() {
        let params = NoiseParams {
            octaves: 0,
            persistence: 1.5,
            lacunarity: 0.5,
            scale: -3.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(params.octaves, 1);
        assert_eq!(params.persistence, 1.0);
        assert_eq!(params.lacunarity, 1.0);
        assert_eq!(params.scale, MIN_SCALE);
    }

    #[test]
    fn test_zero_scale_still_generates() {
        let params = NoiseParams {
            scale: 0.0,
            ..Default::default()
        };
        let grid = generate_noise(8, 8, 3, &params).unwrap();
        assert!(grid.as_slice().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_noise_reproducibility() {
        let params = NoiseParams::default();
        let a = generate_noise(48, 32, 12345, &params).unwrap();
        let b = generate_noise(48, 32, 12345, &params).unwrap();
        assert_eq!(a.as_slice(), b.as_slice(), "same seed must give bit-identical grids");
    }

    #[test]
    fn test_different_seeds_produce_different_results() {
        let params = NoiseParams::default();
        let a = generate_noise(32, 32, 1, &params).unwrap();
        let b = generate_noise(32, 32, 2, &params).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_local_normalization_hits_both_ends() {
        let grid = generate_noise(40, 24, 99, &NoiseParams::default()).unwrap();
        let (min, max) = grid.value_range();
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_global_normalization_is_seamless_across_tiles() {
        let width = 32;
        let height = 16;
        let left = NoiseParams {
            normalize: NormalizeMode::Global,
            ..Default::default()
        };
        // The right tile starts at the left tile's last column.
        let right = NoiseParams {
            offset: Vec2::new((width - 1) as f32, 0.0),
            ..left.clone()
        };

        let a = generate_noise(width, height, 7, &left).unwrap();
        let b = generate_noise(width, height, 7, &right).unwrap();

        for x in 0..height {
            let edge_a = a.get(x, width - 1);
            let edge_b = b.get(x, 0);
            assert!(
                (edge_a - edge_b).abs() < 1e-5,
                "seam at row {}: {} vs {}",
                x,
                edge_a,
                edge_b
            );
        }
    }

    #[test]
    fn test_global_normalization_spans_real_range() {
        let params = NoiseParams {
            scale: 8.0,
            normalize: NormalizeMode::Global,
            ..Default::default()
        };
        let grid = generate_noise(128, 128, 5, &params).unwrap();
        let (min, max) = grid.value_range();
        assert!(max - min > 0.3, "global output is nearly flat: [{}, {}]", min, max);
    }

    #[test]
    fn test_global_normalization_single_octave_is_exact() {
        let params = NoiseParams {
            octaves: 1,
            scale: 12.0,
            normalize: NormalizeMode::Global,
            ..Default::default()
        };
        let (width, height) = (24, 20);
        let grid = generate_noise(width, height, 31, &params).unwrap();

        // Replay the stream the generator consumes.
        let mut rng = seeded_rng(31);
        let perlin = Perlin::new(rng.random());
        let offsets = draw_octave_offsets(&params, &mut rng);

        for x in 0..height {
            for y in 0..width {
                let col = y as f32 - width as f32 / 2.0;
                let row = x as f32 - height as f32 / 2.0;
                let raw = octave_sum(&perlin, &offsets, &params, col, row);
                let expected = (raw + 1.0) / 2.0;
                assert!(
                    (grid.get(x, y) - expected).abs() < 1e-6,
                    "cell ({}, {}): {} vs {}",
                    x,
                    y,
                    grid.get(x, y),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_max_possible_height() {
        let params = NoiseParams {
            octaves: 3,
            persistence: 0.5,
            ..Default::default()
        };
        assert!((params.max_possible_height() - 1.75).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_dimension() {
        assert!(matches!(
            generate_noise(0, 8, 1, &NoiseParams::default()),
            Err(TerrainError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_inverse_lerp_degenerate() {
        assert_eq!(inverse_lerp(0.5, 0.5, 0.5), 0.0);
        assert_eq!(inverse_lerp(0.0, 2.0, 1.0), 0.5);
    }
}
