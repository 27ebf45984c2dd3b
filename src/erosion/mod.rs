//! Terrain shaping after noise generation.
//!
//! Droplet hydraulic erosion, the Gaussian smoothing pass that follows it, and river
//! carving with sea flooding.

mod config;
pub mod hydraulic;
pub mod rivers;
pub mod smoothing;

pub use config::{ErosionParams, RiverConfig, SlopeRule, SmoothingParams, WriteBack};
pub use hydraulic::{erode, simulate_droplet_at, step_erosion, DropletTrace};
pub use rivers::{carve_rivers, RiverMask, RiverTrace};
pub use smoothing::{blur, smooth, Kernel};
