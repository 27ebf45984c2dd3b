//! Droplet-based hydraulic erosion.
//!
//! Each trial drops a particle of water on a random interior cell and walks it downhill
//! for at most `max_droplet_lifetime` steps, eroding where it has spare capacity and
//! depositing where it is overloaded or climbing. Trials run one after another against
//! the same grid; all randomness comes from the caller's stream, so a run split into
//! several batches matches a single run of the same total length.

use glam::Vec2;
use rand::Rng;

use super::config::{ErosionParams, WriteBack};
use crate::terrain::HeightGrid;
use crate::SimRng;

/// What happened during one droplet trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropletTrace {
    /// Steps that moved the droplet and touched the grid.
    pub steps: usize,
    /// Sediment still carried when the trial ended. Equals the net material removed
    /// from the grid by this trial.
    pub sediment: f32,
    /// Last position inside the grid.
    pub end: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Droplet {
    pos: Vec2,
    dir: Vec2,
    speed: f32,
    water: f32,
    sediment: f32,
}

/// Runs `params.iteration_count` droplet trials.
pub fn erode(grid: &mut HeightGrid, params: &ErosionParams, rng: &mut SimRng) {
    step_erosion(grid, params, params.iteration_count, rng);
}

/// Runs `batch_size` droplet trials and returns how many were executed.
///
/// Calling this `n` times with `batch_size = k` leaves the grid and `rng` in the same
/// state as one call with `batch_size = n * k`.
pub fn step_erosion(
    grid: &mut HeightGrid,
    params: &ErosionParams,
    batch_size: usize,
    rng: &mut SimRng,
) -> usize {
    let params = params.sanitized();
    let (width, height) = grid.dimensions();

    if width < 3 || height < 3 {
        log::warn!(
            "grid {}x{} has no interior cells, skipping {} droplet trials",
            width,
            height,
            batch_size
        );
        return batch_size;
    }

    for _ in 0..batch_size {
        let start_x = rng.random_range(1..height - 1);
        let start_y = rng.random_range(1..width - 1);
        simulate_droplet_at(grid, &params, Vec2::new(start_x as f32, start_y as f32));
    }

    log::debug!("ran {} droplet trials", batch_size);
    batch_size
}

/// Simulates a single droplet starting at `start` (`x` = row, `y` = column).
///
/// `start` must lie inside `[0, height - 1) × [0, width - 1)`.
pub fn simulate_droplet_at(
    grid: &mut HeightGrid,
    params: &ErosionParams,
    start: Vec2,
) -> DropletTrace {
    let max_x = (grid.height() - 1) as f32;
    let max_y = (grid.width() - 1) as f32;

    let mut drop = Droplet {
        pos: start,
        dir: Vec2::ZERO,
        speed: params.initial_speed,
        water: params.initial_water_volume,
        sediment: 0.0,
    };
    let mut steps = 0;

    for _ in 0..params.max_droplet_lifetime {
        let cell = drop.pos;
        let sample = grid.height_and_gradient(cell.x, cell.y);
        let gradient = Vec2::new(sample.gradient_x, sample.gradient_y);

        drop.dir = drop.dir * params.inertia - gradient * (1.0 - params.inertia);
        let len = drop.dir.length();
        if len != 0.0 {
            drop.dir /= len;
        }

        let next = drop.pos + drop.dir;
        let outside = next.x < 0.0 || next.x >= max_x || next.y < 0.0 || next.y >= max_y;
        if drop.dir == Vec2::ZERO || outside {
            break;
        }
        drop.pos = next;

        let new_height = grid.height_and_gradient(next.x, next.y).height;
        let delta_height = new_height - sample.height;

        let capacity = (-delta_height * drop.speed * drop.water * params.sediment_capacity_factor)
            .max(params.min_sediment_capacity);

        if drop.sediment > capacity || delta_height > 0.0 {
            let amount = if delta_height > 0.0 {
                delta_height.min(drop.sediment)
            } else {
                (drop.sediment - capacity) * params.deposit_speed
            };
            drop.sediment -= amount;
            write_back(grid, params.write_back, cell, amount);
        } else {
            // Never dig deeper than the step just descended.
            let amount = ((capacity - drop.sediment) * params.erode_speed).min(-delta_height);
            drop.sediment += amount;
            write_back(grid, params.write_back, cell, -amount);
        }

        drop.speed = (drop.speed * drop.speed + delta_height * params.gravity).max(0.0).sqrt();
        drop.water *= 1.0 - params.evaporate_speed;
        steps += 1;
    }

    DropletTrace {
        steps,
        sediment: drop.sediment,
        end: drop.pos,
    }
}

/// Adds `delta` to the grid around the droplet's pre-step position.
fn write_back(grid: &mut HeightGrid, mode: WriteBack, pos: Vec2, delta: f32) {
    let cx = pos.x as usize;
    let cy = pos.y as usize;

    match mode {
        WriteBack::Nearest => grid.add(cx, cy, delta),
        WriteBack::Bilinear => {
            let u = pos.x - cx as f32;
            let v = pos.y - cy as f32;
            grid.add(cx, cy, delta * (1.0 - u) * (1.0 - v));
            grid.add(cx + 1, cy, delta * u * (1.0 - v));
            grid.add(cx, cy + 1, delta * (1.0 - u) * v);
            grid.add(cx + 1, cy + 1, delta * u * v);
        }
        WriteBack::Kernel { width } => {
            let radius = (width / 2) as isize;
            let share = delta / (width * width) as f32;
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    let (x, y) = (cx as isize + dx, cy as isize + dy);
                    if grid.contains(x, y) {
                        grid.add(x as usize, y as usize, share);
                    }
                }
            }
        }
    }
}
