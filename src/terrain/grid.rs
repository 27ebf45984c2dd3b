//! Row-major height/water buffer with bilinear sampling.

use serde::{Deserialize, Serialize};

use crate::error::TerrainError;

/// A `width`×`height` grid of floats stored row-major.
///
/// Cells are addressed as `(x, y)` where `x` is the row (`0..height`) and `y` the column
/// (`0..width`), so the flat index is `x * width + y`. Stepping `x` by one moves a full
/// row (`+width`); stepping `y` moves one cell (`+1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

/// Terrain elevation, conceptually in `[0, 1]`.
pub type HeightGrid = Grid;

/// Water surface elevation; `0.0` means dry.
pub type WaterGrid = Grid;

/// Result of a bilinear sample: interpolated height and its partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightAndGradient {
    pub height: f32,
    /// Derivative along `x` (rows).
    pub gradient_x: f32,
    /// Derivative along `y` (columns).
    pub gradient_y: f32,
}

impl Grid {
    /// Creates a zero-filled grid.
    pub fn new(width: usize, height: usize) -> Result<Self, TerrainError> {
        Self::filled(width, height, 0.0)
    }

    /// Creates a grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self, TerrainError> {
        if width < 1 || height < 1 {
            return Err(TerrainError::InvalidDimension { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![value; width * height],
        })
    }

    /// Wraps an existing row-major buffer. `cells.len()` must equal `width * height`.
    pub fn from_vec(width: usize, height: usize, cells: Vec<f32>) -> Result<Self, TerrainError> {
        if width < 1 || height < 1 {
            return Err(TerrainError::InvalidDimension { width, height });
        }
        assert_eq!(
            cells.len(),
            width * height,
            "buffer length does not match {}x{} grid",
            width,
            height
        );
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// True if `(x, y)` addresses a cell. Accepts signed coordinates so callers can probe
    /// neighbours without underflow.
    #[inline]
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.height && (y as usize) < self.width
    }

    /// Flat index of `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.height && y < self.width,
            "grid access ({}, {}) out of bounds for {}x{} grid",
            x,
            y,
            self.width,
            self.height
        );
        x * self.width + y
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[self.index(x, y)]
    }

    #[inline]
    pub fn try_get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.height && y < self.width {
            Some(self.cells[x * self.width + y])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let i = self.index(x, y);
        self.cells[i] = value;
    }

    #[inline]
    pub fn add(&mut self, x: usize, y: usize, delta: f32) {
        let i = self.index(x, y);
        self.cells[i] += delta;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.cells
    }

    /// Sum of all cells, accumulated in `f64`.
    pub fn sum(&self) -> f64 {
        self.cells.iter().map(|&v| v as f64).sum()
    }

    /// Returns `(min, max)` over all cells.
    pub fn value_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.cells {
            min = min.min(v);
            max = max.max(v);
        }
        (min, max)
    }

    /// Bilinear height and gradient at a fractional position.
    ///
    /// Reads the 2×2 cell block `{current, east, south, south_east}` where east is the next
    /// row (`x + 1`) and south the next column (`y + 1`). The position must satisfy
    /// `0 <= x < height - 1` and `0 <= y < width - 1`.
    pub fn height_and_gradient(&self, x: f32, y: f32) -> HeightAndGradient {
        assert!(
            x >= 0.0 && y >= 0.0,
            "sample position ({}, {}) is negative",
            x,
            y
        );
        let cx = x as usize;
        let cy = y as usize;
        assert!(
            cx + 1 < self.height && cy + 1 < self.width,
            "sample position ({}, {}) out of bounds for {}x{} grid",
            x,
            y,
            self.width,
            self.height
        );

        let u = x - cx as f32;
        let v = y - cy as f32;

        let i = cx * self.width + cy;
        let current = self.cells[i];
        let east = self.cells[i + self.width];
        let south = self.cells[i + 1];
        let south_east = self.cells[i + self.width + 1];

        let gradient_x = (east - current) * (1.0 - v) + (south_east - south) * v;
        let gradient_y = (south - current) * (1.0 - u) + (south_east - east) * u;

        let height = current * (1.0 - u) * (1.0 - v)
            + east * u * (1.0 - v)
            + south * (1.0 - u) * v
            + south_east * u * v;

        HeightAndGradient {
            height,
            gradient_x,
            gradient_y,
        }
    }

    /// In-bounds 8-connected neighbours of `(x, y)`, scanned row offset first
    /// (`-1, 0, 1`) and column offset ascending within each row.
    pub fn neighbors_8(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (x, y) = (x as isize, y as isize);
        (-1isize..=1)
            .flat_map(move |dx| (-1isize..=1).map(move |dy| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(move |(dx, dy)| (x + dx, y + dy))
            .filter(move |&(nx, ny)| self.contains(nx, ny))
            .map(|(nx, ny)| (nx as usize, ny as usize))
    }
}
