//! Top-level simulation configuration and JSON persistence.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::erosion::{ErosionParams, RiverConfig, SmoothingParams};
use crate::noise::NoiseParams;
use crate::terrain::HeightCurve;

/// Errors that can occur while loading or saving a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the simulation driver needs, loaded before the run starts.
///
/// Missing fields in a JSON file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
    pub noise: NoiseParams,
    pub erosion: ErosionParams,
    pub smoothing: SmoothingParams,
    pub rivers: RiverConfig,
    /// Droplet trials per `step` when running to completion.
    pub batch_size: usize,
    /// Optional remap applied right after noise generation.
    pub height_curve: Option<HeightCurve>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            seed: 0,
            noise: NoiseParams::default(),
            erosion: ErosionParams::default(),
            smoothing: SmoothingParams::default(),
            rivers: RiverConfig::default(),
            batch_size: 50_000,
            height_curve: None,
        }
    }
}

impl SimulationConfig {
    /// Square map of `size` cells with the given seed and default parameters.
    pub fn square(size: usize, seed: u64) -> Self {
        Self {
            width: size,
            height: size,
            seed,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
