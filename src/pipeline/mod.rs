//! Simulation orchestration.
//!
//! Bundles every knob into one serializable configuration and drives the
//! noise, erosion, smoothing and river stages over a single owned heightmap.

mod config;
mod simulation;

pub use config::{ConfigError, SimulationConfig};
pub use simulation::{Simulation, SimulationState, StepProgress};
