//! Procedural heightmap synthesis.
//!
//! This crate builds terrain in four stages over a single row-major grid:
//! fractal gradient noise, droplet-based hydraulic erosion, Gaussian smoothing,
//! and river carving with sea flooding. The [`Simulation`] driver runs them in
//! order and lets erosion be advanced in bounded batches.
//!
//! Every random draw comes from one seeded stream, so a given seed and
//! configuration always produce the same terrain.

pub mod error;
pub mod erosion;
pub mod export;
pub mod noise;
pub mod pipeline;
pub mod terrain;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The shared random stream used by every stage.
pub type SimRng = ChaCha8Rng;

/// Creates the random stream for `seed`.
pub fn seeded_rng(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

pub use error::TerrainError;
pub use erosion::{
    carve_rivers, smooth, step_erosion, ErosionParams, RiverConfig, SlopeRule, SmoothingParams,
    WriteBack,
};
pub use noise::{generate_noise, NoiseParams, NormalizeMode};
pub use pipeline::{Simulation, SimulationConfig, SimulationState, StepProgress};
pub use terrain::{Grid, HeightCurve, HeightGrid, WaterGrid};
