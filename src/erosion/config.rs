//! Erosion, smoothing and river configuration.

use serde::{Deserialize, Serialize};

/// Where a droplet's erode/deposit amount is written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum WriteBack {
    /// Whole amount goes to the droplet's integer-truncated cell.
    #[default]
    Nearest,
    /// Amount is split over the 2×2 block around the droplet by bilinear weights.
    Bilinear,
    /// Amount is spread evenly over a `width`×`width` box centred on the droplet's cell.
    /// Taps falling outside the grid are dropped.
    Kernel { width: usize },
}

/// Parameters for droplet hydraulic erosion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    /// Number of droplet trials for a full run.
    pub iteration_count: usize,
    /// 0 = droplet turns straight downhill, 1 = never changes direction.
    pub inertia: f32,
    /// Multiplier for how much sediment a droplet can carry.
    pub sediment_capacity_factor: f32,
    /// Capacity floor so flat ground still erodes a little.
    pub min_sediment_capacity: f32,
    /// Fraction of spare capacity eroded per step, in `[0, 1]`.
    pub erode_speed: f32,
    /// Fraction of surplus sediment deposited per step, in `[0, 1]`.
    pub deposit_speed: f32,
    /// Fraction of water lost per step, in `[0, 1]`.
    pub evaporate_speed: f32,
    pub gravity: f32,
    pub max_droplet_lifetime: usize,
    pub initial_water_volume: f32,
    pub initial_speed: f32,
    pub write_back: WriteBack,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            iteration_count: 400_000,
            inertia: 0.05,
            sediment_capacity_factor: 4.0,
            min_sediment_capacity: 0.01,
            erode_speed: 0.3,
            deposit_speed: 0.3,
            evaporate_speed: 0.01,
            gravity: 4.0,
            max_droplet_lifetime: 30,
            initial_water_volume: 1.0,
            initial_speed: 1.0,
            write_back: WriteBack::Nearest,
        }
    }
}

impl ErosionParams {
    /// Returns a copy with rate parameters clamped to `[0, 1]` and the rest non-negative.
    pub fn sanitized(&self) -> Self {
        let write_back = match self.write_back {
            WriteBack::Kernel { width } => WriteBack::Kernel { width: width.max(1) | 1 },
            other => other,
        };
        Self {
            iteration_count: self.iteration_count,
            inertia: self.inertia.clamp(0.0, 1.0),
            sediment_capacity_factor: self.sediment_capacity_factor.max(0.0),
            min_sediment_capacity: self.min_sediment_capacity.max(0.0),
            erode_speed: self.erode_speed.clamp(0.0, 1.0),
            deposit_speed: self.deposit_speed.clamp(0.0, 1.0),
            evaporate_speed: self.evaporate_speed.clamp(0.0, 1.0),
            gravity: self.gravity.max(0.0),
            max_droplet_lifetime: self.max_droplet_lifetime,
            initial_water_volume: self.initial_water_volume.max(0.0),
            initial_speed: self.initial_speed.max(0.0),
            write_back,
        }
    }
}

/// Gaussian smoothing applied once erosion finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Odd kernel width; `1` disables smoothing.
    pub kernel_width: usize,
    pub sigma: f32,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            kernel_width: 3,
            sigma: 1.0,
        }
    }
}

/// Neighbour choice while tracing a river.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SlopeRule {
    /// Move to the neighbour with the largest `neighbour - current` difference, i.e. the
    /// highest neighbour. This is the historical behaviour and stays the default.
    #[default]
    SteepestAscent,
    /// Move to the neighbour with the smallest difference, i.e. flow downhill.
    SteepestDescent,
}

/// Parameters for river carving and sea flooding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Cells below this height are flooded to it.
    pub sea_level: f32,
    /// River sources are drawn from cells strictly between `sea_level` and this height.
    pub max_river_height: f32,
    pub river_count: usize,
    /// Half-width of the dilation stamp; `1` leaves traced paths one cell wide.
    pub river_width: usize,
    pub slope_rule: SlopeRule,
    /// Safety cap on steps per trace.
    pub max_trace_steps: usize,
    /// Fraction of the water height removed from terrain under a river.
    pub carve_factor: f32,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            sea_level: 0.4,
            max_river_height: 0.8,
            river_count: 5,
            river_width: 1,
            slope_rule: SlopeRule::SteepestAscent,
            max_trace_steps: 100_000,
            carve_factor: 0.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_rates() {
        let params = ErosionParams {
            inertia: 2.0,
            erode_speed: -1.0,
            deposit_speed: 1.5,
            evaporate_speed: 3.0,
            gravity: -4.0,
            write_back: WriteBack::Kernel { width: 4 },
            ..Default::default()
        }
        .sanitized();

        assert_eq!(params.inertia, 1.0);
        assert_eq!(params.erode_speed, 0.0);
        assert_eq!(params.deposit_speed, 1.0);
        assert_eq!(params.evaporate_speed, 1.0);
        assert_eq!(params.gravity, 0.0);
        assert_eq!(params.write_back, WriteBack::Kernel { width: 5 });
    }

    #[test]
    fn test_defaults_roundtrip_json() {
        let params = ErosionParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: ErosionParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);

        let json = serde_json::to_string(&RiverConfig::default()).unwrap();
        let rivers: RiverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(rivers.slope_rule, SlopeRule::SteepestAscent);
    }
}
