//! Resumable simulation driver.
//!
//! The driver owns the heightmap and the shared random stream and moves through
//! `Idle -> NoiseGenerated -> Eroding -> Smoothing -> Done`. Erosion is time-sliced: each
//! [`Simulation::step`] runs a bounded batch of droplets and returns, so a caller can
//! interleave progress with other work. River carving can be triggered on demand once a
//! heightmap exists and is not mid-erosion. Carving a fresh heightmap does not cancel
//! erosion: the next step picks the droplet trials up where they would have started.

use super::config::SimulationConfig;
use crate::erosion::{blur, carve_rivers, step_erosion};
use crate::error::TerrainError;
use crate::noise::generate_noise_with_rng;
use crate::terrain::{HeightGrid, WaterGrid};
use crate::{seeded_rng, SimRng};

/// Where the driver is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationState {
    /// Nothing generated yet.
    Idle,
    /// Fresh noise heightmap; erosion has not started.
    NoiseGenerated,
    /// Some but not all droplet trials have run.
    Eroding,
    /// All trials done; the next step blurs the grid.
    Smoothing,
    /// Rivers carved into the current heightmap. Steps resume erosion if it never ran.
    RiverCarved,
    /// Erosion and smoothing finished.
    Done,
}

impl SimulationState {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            SimulationState::Idle => "idle",
            SimulationState::NoiseGenerated => "noise-generated",
            SimulationState::Eroding => "eroding",
            SimulationState::Smoothing => "smoothing",
            SimulationState::RiverCarved => "river-carved",
            SimulationState::Done => "done",
        }
    }
}

/// Snapshot returned by every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProgress {
    pub state: SimulationState,
    /// Droplet trials run since the last `generate`.
    pub processed: usize,
    pub total: usize,
    /// Trials run by this call.
    pub executed: usize,
}

impl StepProgress {
    /// Fraction of droplet trials completed, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.processed as f32 / self.total as f32).min(1.0)
        }
    }
}

/// Owns the terrain and drives it through noise, erosion, smoothing and carving.
pub struct Simulation {
    config: SimulationConfig,
    state: SimulationState,
    grid: HeightGrid,
    water: Option<WaterGrid>,
    rng: SimRng,
    processed: usize,
    /// Stage that stepping returns to after a carve on a not yet eroded heightmap.
    resume: Option<SimulationState>,
}

impl Simulation {
    /// Creates an idle driver with a zeroed heightmap.
    pub fn new(config: SimulationConfig) -> Result<Self, TerrainError> {
        let grid = HeightGrid::new(config.width, config.height)?;
        let rng = seeded_rng(config.seed);
        Ok(Self {
            config,
            state: SimulationState::Idle,
            grid,
            water: None,
            rng,
            processed: 0,
            resume: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// `true` once stepping can make no further progress.
    pub fn is_finished(&self) -> bool {
        match self.state {
            SimulationState::Done => true,
            SimulationState::RiverCarved => self.resume.is_none(),
            _ => false,
        }
    }

    pub fn processed_iterations(&self) -> usize {
        self.processed
    }

    pub fn total_iterations(&self) -> usize {
        self.config.erosion.iteration_count
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    /// Water grid from the last carve, if any.
    pub fn water(&self) -> Option<&WaterGrid> {
        self.water.as_ref()
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Terrain height at row `x`, column `y`. Panics outside the grid.
    pub fn height_at(&self, x: usize, y: usize) -> f32 {
        self.grid.get(x, y)
    }

    /// Water height at row `x`, column `y`; `0.0` before any carve. Panics outside the grid.
    pub fn water_at(&self, x: usize, y: usize) -> f32 {
        match &self.water {
            Some(water) => water.get(x, y),
            None => {
                assert!(
                    x < self.grid.height() && y < self.grid.width(),
                    "water access ({}, {}) out of bounds for {}x{} grid",
                    x,
                    y,
                    self.grid.width(),
                    self.grid.height()
                );
                0.0
            }
        }
    }

    fn progress(&self, executed: usize) -> StepProgress {
        StepProgress {
            state: self.state,
            processed: self.processed,
            total: self.total_iterations(),
            executed,
        }
    }

    /// Reseeds the stream, regenerates noise and discards erosion progress and water.
    pub fn generate(&mut self) -> Result<(), TerrainError> {
        let (width, height) = (self.config.width, self.config.height);
        self.rng = seeded_rng(self.config.seed);
        let mut grid = generate_noise_with_rng(width, height, &self.config.noise, &mut self.rng)?;
        if let Some(curve) = &self.config.height_curve {
            curve.apply(&mut grid);
        }

        self.grid = grid;
        self.water = None;
        self.processed = 0;
        self.resume = None;
        self.state = SimulationState::NoiseGenerated;
        log::info!("generated {}x{} heightmap with seed {}", width, height, self.config.seed);
        Ok(())
    }

    /// Advances the simulation by at most `batch_size` droplet trials.
    ///
    /// Once every trial has run the state becomes `Smoothing`; the following call blurs
    /// the grid and finishes. After a carve on a fresh heightmap the first step resumes
    /// erosion on the carved terrain. Otherwise `Done` and `RiverCarved` do nothing.
    pub fn step(&mut self, batch_size: usize) -> Result<StepProgress, TerrainError> {
        if let Some(resume) = self.resume.take() {
            log::info!("resuming {} after river carve", resume.name());
            self.state = resume;
        }

        match self.state {
            SimulationState::Idle => Err(TerrainError::InvalidState {
                operation: "step",
                state: self.state.name(),
            }),
            SimulationState::NoiseGenerated | SimulationState::Eroding => {
                let total = self.total_iterations();
                let batch = batch_size.min(total - self.processed);
                let executed =
                    step_erosion(&mut self.grid, &self.config.erosion, batch, &mut self.rng);
                self.processed += executed;

                if self.processed >= total {
                    self.state = SimulationState::Smoothing;
                    log::info!("erosion finished after {} droplets", self.processed);
                } else {
                    self.state = SimulationState::Eroding;
                }
                log::debug!("erosion progress {}/{}", self.processed, total);
                Ok(self.progress(executed))
            }
            SimulationState::Smoothing => {
                let smoothing = &self.config.smoothing;
                blur(&mut self.grid, smoothing.kernel_width, smoothing.sigma);
                self.state = SimulationState::Done;
                log::info!(
                    "smoothed heightmap with kernel {} sigma {}",
                    smoothing.kernel_width,
                    smoothing.sigma
                );
                Ok(self.progress(0))
            }
            SimulationState::RiverCarved | SimulationState::Done => Ok(self.progress(0)),
        }
    }

    /// Steps with the configured batch size until finished, generating first if idle.
    pub fn run(&mut self) -> Result<StepProgress, TerrainError> {
        let batch = self.config.batch_size;
        self.run_with_progress(batch, |_, _| {})
    }

    /// Steps with `batch_size` until finished, calling `on_progress(processed, total)`
    /// after every step.
    pub fn run_with_progress<F>(
        &mut self,
        batch_size: usize,
        mut on_progress: F,
    ) -> Result<StepProgress, TerrainError>
    where
        F: FnMut(usize, usize),
    {
        if self.state == SimulationState::Idle {
            self.generate()?;
        }
        let batch_size = batch_size.max(1);

        let mut progress = self.progress(0);
        while !self.is_finished() {
            progress = self.step(batch_size)?;
            on_progress(progress.processed, progress.total);
        }
        Ok(progress)
    }

    /// Carves rivers into the current heightmap and stores the resulting water grid.
    ///
    /// Allowed on a fresh heightmap, after smoothing, or again after a previous carve.
    /// Carving a fresh heightmap leaves erosion pending for the next step.
    /// On error the heightmap and state are unchanged.
    pub fn carve_rivers(&mut self) -> Result<&WaterGrid, TerrainError> {
        let resume = match self.state {
            SimulationState::NoiseGenerated => Some(SimulationState::NoiseGenerated),
            SimulationState::Done => None,
            SimulationState::RiverCarved => self.resume,
            state => {
                return Err(TerrainError::InvalidState {
                    operation: "carve rivers",
                    state: state.name(),
                })
            }
        };

        let water = carve_rivers(&mut self.grid, &self.config.rivers, &mut self.rng)?;
        self.state = SimulationState::RiverCarved;
        self.resume = resume;
        Ok(&*self.water.insert(water))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::ErosionParams;

    fn small_config(iterations: usize) -> SimulationConfig {
        SimulationConfig {
            erosion: ErosionParams {
                iteration_count: iterations,
                ..Default::default()
            },
            batch_size: 100,
            ..SimulationConfig::square(32, 11)
        }
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SimulationState::Idle.name(), "idle");
        assert_eq!(SimulationState::RiverCarved.name(), "river-carved");
        assert_eq!(SimulationState::Smoothing.name(), "smoothing");
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let config = SimulationConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(TerrainError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_step_before_generate_fails() {
        let mut sim = Simulation::new(small_config(10)).unwrap();
        assert!(matches!(
            sim.step(5),
            Err(TerrainError::InvalidState { operation: "step", state: "idle" })
        ));
    }

    #[test]
    fn test_step_walks_through_states() {
        let mut sim = Simulation::new(small_config(250)).unwrap();
        sim.generate().unwrap();
        assert_eq!(sim.state(), SimulationState::NoiseGenerated);

        let p = sim.step(100).unwrap();
        assert_eq!((p.state, p.processed, p.executed), (SimulationState::Eroding, 100, 100));
        sim.step(100).unwrap();
        let p = sim.step(100).unwrap();
        assert_eq!(p.executed, 50);
        assert_eq!(p.processed, 250);
        assert_eq!(p.state, SimulationState::Smoothing);
        assert_eq!(p.fraction(), 1.0);

        let p = sim.step(100).unwrap();
        assert_eq!(p.state, SimulationState::Done);
        assert_eq!(p.executed, 0);

        let before = sim.grid().clone();
        sim.step(100).unwrap();
        assert_eq!(sim.grid(), &before);
    }

    #[test]
    fn test_carve_rejected_mid_erosion() {
        let mut sim = Simulation::new(small_config(300)).unwrap();
        sim.generate().unwrap();
        sim.step(10).unwrap();
        assert!(matches!(
            sim.carve_rivers(),
            Err(TerrainError::InvalidState { state: "eroding", .. })
        ));
        assert_eq!(sim.state(), SimulationState::Eroding);
    }

    #[test]
    fn test_regenerate_resets_progress() {
        let mut sim = Simulation::new(small_config(300)).unwrap();
        sim.generate().unwrap();
        let fresh = sim.grid().clone();
        sim.step(120).unwrap();
        assert_eq!(sim.processed_iterations(), 120);

        sim.generate().unwrap();
        assert_eq!(sim.processed_iterations(), 0);
        assert_eq!(sim.state(), SimulationState::NoiseGenerated);
        assert_eq!(sim.grid(), &fresh);
    }

    #[test]
    fn test_run_with_progress_reports_every_batch() {
        let mut sim = Simulation::new(small_config(250)).unwrap();
        let mut calls = Vec::new();
        let done = sim
            .run_with_progress(100, |processed, total| calls.push((processed, total)))
            .unwrap();

        assert_eq!(done.state, SimulationState::Done);
        assert_eq!(calls, vec![(100, 250), (200, 250), (250, 250), (250, 250)]);
    }

    #[test]
    fn test_zero_iterations_go_straight_to_smoothing() {
        let mut sim = Simulation::new(small_config(0)).unwrap();
        sim.generate().unwrap();
        let p = sim.step(100).unwrap();
        assert_eq!(p.state, SimulationState::Smoothing);
        assert_eq!(p.executed, 0);
    }

    #[test]
    fn test_water_before_carve_is_dry() {
        let mut sim = Simulation::new(small_config(0)).unwrap();
        sim.generate().unwrap();
        assert!(sim.water().is_none());
        assert_eq!(sim.water_at(3, 4), 0.0);
        assert_eq!(sim.dimensions(), (32, 32));
    }

    #[test]
    fn test_carve_after_generate_keeps_erosion_pending() {
        let mut sim = Simulation::new(small_config(250)).unwrap();
        sim.generate().unwrap();
        sim.carve_rivers().unwrap();
        assert_eq!(sim.state(), SimulationState::RiverCarved);
        assert!(sim.water().is_some());
        assert!(!sim.is_finished());

        let p = sim.step(100).unwrap();
        assert_eq!((p.state, p.processed, p.executed), (SimulationState::Eroding, 100, 100));

        let done = sim.run().unwrap();
        assert_eq!(done.state, SimulationState::Done);
        assert_eq!(sim.processed_iterations(), 250);
        assert!(sim.water().is_some());
    }

    #[test]
    fn test_run_after_early_carve_finishes_erosion() {
        let mut sim = Simulation::new(small_config(250)).unwrap();
        sim.generate().unwrap();
        sim.carve_rivers().unwrap();
        // A second carve before any step must not lose the pending erosion.
        sim.carve_rivers().unwrap();

        let done = sim.run().unwrap();
        assert_eq!(done.state, SimulationState::Done);
        assert_eq!((done.processed, done.total), (250, 250));
    }

    #[test]
    fn test_carve_after_done_is_terminal() {
        let mut sim = Simulation::new(small_config(100)).unwrap();
        sim.run().unwrap();
        sim.carve_rivers().unwrap();
        assert_eq!(sim.state(), SimulationState::RiverCarved);
        assert!(sim.is_finished());

        let carved = sim.grid().clone();
        let p = sim.step(100).unwrap();
        assert_eq!((p.state, p.executed), (SimulationState::RiverCarved, 0));
        assert_eq!(sim.grid(), &carved);
    }

    #[test]
    fn test_generate_clears_pending_resume() {
        let mut sim = Simulation::new(small_config(0)).unwrap();
        sim.generate().unwrap();
        sim.carve_rivers().unwrap();
        sim.generate().unwrap();
        assert_eq!(sim.state(), SimulationState::NoiseGenerated);
        assert!(!sim.is_finished());
    }
}
