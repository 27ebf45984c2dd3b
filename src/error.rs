//! Error type shared by the simulation stages.

use thiserror::Error;

/// Recoverable failures reported by noise generation, river carving and the driver.
///
/// Out-of-bounds grid access is not represented here: it is a programming error and
/// panics at the access site.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    #[error("Invalid grid dimensions {width}x{height}: both must be at least 1")]
    InvalidDimension { width: usize, height: usize },

    #[error(
        "Invalid river band: max river height ({max_river_height}) must be above sea level \
         ({sea_level})"
    )]
    InvalidRiverBand { sea_level: f32, max_river_height: f32 },

    #[error(
        "No cell lies strictly between sea level ({sea_level}) and max river height \
         ({max_river_height})"
    )]
    NoSeedAvailable { sea_level: f32, max_river_height: f32 },

    #[error("Cannot {operation} while simulation is in state '{state}'")]
    InvalidState { operation: &'static str, state: &'static str },
}
