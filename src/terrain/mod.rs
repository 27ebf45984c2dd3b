//! Terrain data module.
//!
//! Provides the shared height/water grid every stage reads and mutates, plus
//! post-generation height remapping.

mod curve;
mod grid;

pub use curve::HeightCurve;
pub use grid::{Grid, HeightAndGradient, HeightGrid, WaterGrid};
