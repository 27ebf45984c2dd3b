//! River tracing and sea flooding.
//!
//! Sources are drawn from the band between sea level and `max_river_height`, traced over
//! the 8-neighbourhood into a boolean mask, optionally widened, and finally merged with
//! the sea into a separate water-height grid. Carved cells lose a small fraction of their
//! height so channels stay visible once water is drawn on top.

use rand::Rng;

use super::config::{RiverConfig, SlopeRule};
use crate::error::TerrainError;
use crate::terrain::{HeightGrid, WaterGrid};
use crate::SimRng;

/// Cells touched by at least one river.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiverMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl RiverMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn for_grid(grid: &HeightGrid) -> Self {
        Self::new(grid.width(), grid.height())
    }

    pub fn mark(&mut self, x: usize, y: usize) {
        assert!(x < self.height && y < self.width, "river mask access out of bounds");
        self.cells[x * self.width + y] = true;
    }

    pub fn is_marked(&self, x: usize, y: usize) -> bool {
        assert!(x < self.height && y < self.width, "river mask access out of bounds");
        self.cells[x * self.width + y]
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// Result of following one river from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiverTrace {
    pub start: (usize, usize),
    pub end: (usize, usize),
    /// Moves made before stopping.
    pub steps: usize,
    /// `false` when the trace gave up at the step cap.
    pub reached_sea: bool,
}

/// Picks `river_count` source cells, with replacement, from cells strictly inside the
/// `(sea_level, max_river_height)` band.
pub fn select_sources(
    grid: &HeightGrid,
    config: &RiverConfig,
    rng: &mut SimRng,
) -> Result<Vec<(usize, usize)>, TerrainError> {
    let candidates: Vec<(usize, usize)> = (0..grid.height())
        .flat_map(|x| (0..grid.width()).map(move |y| (x, y)))
        .filter(|&(x, y)| {
            let h = grid.get(x, y);
            h > config.sea_level && h < config.max_river_height
        })
        .collect();

    if candidates.is_empty() {
        return Err(TerrainError::NoSeedAvailable {
            sea_level: config.sea_level,
            max_river_height: config.max_river_height,
        });
    }

    Ok((0..config.river_count)
        .map(|_| candidates[rng.random_range(0..candidates.len())])
        .collect())
}

/// Follows a river from `start`, marking every visited cell in `mask`.
///
/// Each move goes to the neighbour chosen by `config.slope_rule`; ties keep the first
/// neighbour in row-then-column scan order. Stops once the current cell is at or below
/// sea level or after `config.max_trace_steps` moves.
pub fn trace_river(
    grid: &HeightGrid,
    start: (usize, usize),
    config: &RiverConfig,
    mask: &mut RiverMask,
) -> RiverTrace {
    let mut current = start;
    let mut steps = 0;
    let mut reached_sea = false;

    loop {
        mask.mark(current.0, current.1);
        let here = grid.get(current.0, current.1);
        if here <= config.sea_level {
            reached_sea = true;
            break;
        }
        if steps >= config.max_trace_steps {
            break;
        }

        let Some(next) = pick_neighbor(grid, current, here, config.slope_rule) else {
            break;
        };
        current = next;
        steps += 1;
    }

    if !reached_sea {
        log::debug!(
            "river from {:?} stopped at {:?} after {} steps without reaching the sea",
            start,
            current,
            steps
        );
    }

    RiverTrace {
        start,
        end: current,
        steps,
        reached_sea,
    }
}

fn pick_neighbor(
    grid: &HeightGrid,
    (x, y): (usize, usize),
    here: f32,
    rule: SlopeRule,
) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f32)> = None;
    for (nx, ny) in grid.neighbors_8(x, y) {
        let diff = grid.get(nx, ny) - here;
        let better = match (best, rule) {
            (None, _) => true,
            (Some((_, d)), SlopeRule::SteepestAscent) => diff > d,
            (Some((_, d)), SlopeRule::SteepestDescent) => diff < d,
        };
        if better {
            best = Some(((nx, ny), diff));
        }
    }
    best.map(|(cell, _)| cell)
}

/// Grows `mask` by stamping a `(2 * river_width + 1)`-wide square on every marked cell.
pub fn dilate(mask: &RiverMask, river_width: usize) -> RiverMask {
    let mut out = mask.clone();
    let r = river_width as isize;
    for x in 0..mask.height {
        for y in 0..mask.width {
            if !mask.is_marked(x, y) {
                continue;
            }
            for dx in -r..=r {
                for dy in -r..=r {
                    let (nx, ny) = (x as isize + dx, y as isize + dy);
                    let inside = nx >= 0 && ny >= 0;
                    if inside && (nx as usize) < mask.height && (ny as usize) < mask.width {
                        out.mark(nx as usize, ny as usize);
                    }
                }
            }
        }
    }
    out
}

/// Builds the water grid from the sea and `mask`, lowering terrain under rivers.
///
/// Cells below sea level get water at sea level and keep their height. Masked cells at or
/// above sea level get water at their own height, then lose `carve_factor` of it.
pub fn merge(grid: &mut HeightGrid, mask: &RiverMask, config: &RiverConfig) -> WaterGrid {
    let (width, height) = grid.dimensions();
    let mut water: WaterGrid = grid.clone();
    water.as_mut_slice().fill(0.0);

    for x in 0..height {
        for y in 0..width {
            let h = grid.get(x, y);
            if h < config.sea_level {
                water.set(x, y, config.sea_level);
            } else if mask.is_marked(x, y) {
                water.set(x, y, h);
                grid.set(x, y, (h - config.carve_factor * h).max(0.0));
            }
        }
    }

    water
}

/// Carves `config.river_count` rivers into `grid` and returns the water grid.
///
/// On error the grid is left untouched.
pub fn carve_rivers(
    grid: &mut HeightGrid,
    config: &RiverConfig,
    rng: &mut SimRng,
) -> Result<WaterGrid, TerrainError> {
    let mut mask = RiverMask::for_grid(grid);

    if config.river_count > 0 {
        if config.max_river_height <= config.sea_level {
            return Err(TerrainError::InvalidRiverBand {
                sea_level: config.sea_level,
                max_river_height: config.max_river_height,
            });
        }

        for source in select_sources(grid, config, rng)? {
            trace_river(grid, source, config, &mut mask);
        }
    }

    if config.river_width > 1 {
        mask = dilate(&mask, config.river_width);
    }

    log::info!(
        "carving {} rivers over {} cells at sea level {}",
        config.river_count,
        mask.count(),
        config.sea_level
    );

    Ok(merge(grid, &mask, config))
}
