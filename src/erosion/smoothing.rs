//! Kernel convolution used to denoise the grid after erosion.

use crate::terrain::{Grid, HeightGrid};

/// Square convolution kernel of odd width whose weights sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Normalized 2D Gaussian. Even widths are bumped to the next odd width.
    pub fn gaussian(width: usize, sigma: f32) -> Self {
        let width = odd_width(width);
        let sigma = if sigma > 0.0 { sigma } else { f32::EPSILON };
        let center = (width / 2) as f32;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let constant = 1.0 / (std::f32::consts::PI * two_sigma_sq);

        let mut weights = Vec::with_capacity(width * width);
        for i in 0..width {
            for j in 0..width {
                let (di, dj) = (i as f32 - center, j as f32 - center);
                weights.push(constant * (-(di * di + dj * dj) / two_sigma_sq).exp());
            }
        }
        Self::normalized(width, weights)
    }

    /// Box kernel where every tap weighs `1 / width²`.
    pub fn uniform(width: usize) -> Self {
        let width = odd_width(width);
        let w = 1.0 / (width * width) as f32;
        Self {
            width,
            weights: vec![w; width * width],
        }
    }

    fn normalized(width: usize, mut weights: Vec<f32>) -> Self {
        let sum: f32 = weights.iter().sum();
        if sum > 0.0 {
            for w in &mut weights {
                *w /= sum;
            }
        }
        Self { width, weights }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn radius(&self) -> usize {
        self.width / 2
    }

    #[inline]
    pub fn weight(&self, i: usize, j: usize) -> f32 {
        self.weights[i * self.width + j]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

fn odd_width(width: usize) -> usize {
    if width % 2 == 0 {
        log::warn!("kernel width {} is even, using {}", width, width + 1);
        width + 1
    } else {
        width
    }
}

/// Convolves `grid` with `kernel` in place.
///
/// Taps outside the grid are skipped and the remaining weights are not rescaled, so
/// border cells see a kernel that sums to less than 1.
pub fn convolve(grid: &mut Grid, kernel: &Kernel) {
    let source = grid.clone();
    let (width, height) = grid.dimensions();
    let radius = kernel.radius() as isize;

    for x in 0..height {
        for y in 0..width {
            let x0 = x as isize - radius;
            let y0 = y as isize - radius;
            let x_start = x0.max(0) as usize;
            let y_start = y0.max(0) as usize;
            let x_end = ((x0 + kernel.width() as isize) as usize).min(height);
            let y_end = ((y0 + kernel.width() as isize) as usize).min(width);

            let mut sum = 0.0f32;
            for i in x_start..x_end {
                for j in y_start..y_end {
                    let ki = (i as isize - x0) as usize;
                    let kj = (j as isize - y0) as usize;
                    sum += source.get(i, j) * kernel.weight(ki, kj);
                }
            }
            grid.set(x, y, sum);
        }
    }
}

/// Gaussian blur of `kernel_width` and `sigma`, in place.
pub fn blur(grid: &mut HeightGrid, kernel_width: usize, sigma: f32) {
    convolve(grid, &Kernel::gaussian(kernel_width, sigma));
}

/// Returns a Gaussian-blurred copy of `grid`.
pub fn smooth(grid: &HeightGrid, kernel_width: usize, sigma: f32) -> HeightGrid {
    let mut out = grid.clone();
    blur(&mut out, kernel_width, sigma);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(width: usize, height: usize, x: usize, y: usize, value: f32) -> Grid {
        let mut grid = Grid::new(width, height).unwrap();
        grid.set(x, y, value);
        grid
    }

    #[test]
    fn test_gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = Kernel::gaussian(5, 1.2);
        let sum: f32 = kernel.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..5 {
            for j in 0..5 {
                assert!((kernel.weight(i, j) - kernel.weight(j, i)).abs() < 1e-7);
                assert!((kernel.weight(i, j) - kernel.weight(4 - i, 4 - j)).abs() < 1e-7);
            }
        }
        assert!(kernel.weight(2, 2) > kernel.weight(1, 2));
    }

    #[test]
    fn test_even_width_is_bumped() {
        assert_eq!(Kernel::gaussian(4, 1.0).width(), 5);
        assert_eq!(Kernel::uniform(2).width(), 3);
    }

    #[test]
    fn test_width_one_is_identity() {
        let mut grid = Grid::new(6, 4).unwrap();
        for (i, h) in grid.as_mut_slice().iter_mut().enumerate() {
            *h = (i as f32 * 0.37).sin();
        }
        let before = grid.clone();
        blur(&mut grid, 1, 0.8);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_box_kernel_spreads_impulse() {
        let mut grid = impulse(5, 5, 2, 2, 9.0);
        convolve(&mut grid, &Kernel::uniform(3));

        for x in 0..5 {
            for y in 0..5 {
                let expected = if (1..=3).contains(&x) && (1..=3).contains(&y) { 1.0 } else { 0.0 };
                assert!(
                    (grid.get(x, y) - expected).abs() < 1e-6,
                    "cell ({}, {}) = {}",
                    x,
                    y,
                    grid.get(x, y)
                );
            }
        }
    }

    #[test]
    fn test_border_weights_are_not_renormalized() {
        let mut grid = impulse(5, 5, 0, 0, 9.0);
        convolve(&mut grid, &Kernel::uniform(3));

        for (x, y) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!((grid.get(x, y) - 1.0).abs() < 1e-6);
        }
        assert_eq!(grid.get(2, 2), 0.0);
        // Five of the nine taps fell off the grid and their mass is gone.
        assert!((grid.sum() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_constant_grid_darkens_only_at_border() {
        let mut grid = Grid::filled(6, 6, 1.0).unwrap();
        blur(&mut grid, 3, 1.0);
        assert!((grid.get(3, 3) - 1.0).abs() < 1e-5);
        assert!(grid.get(0, 0) < 0.9);
        assert!(grid.get(0, 3) < 1.0);
    }

    #[test]
    fn test_smooth_returns_copy() {
        let grid = impulse(4, 4, 1, 1, 1.0);
        let blurred = smooth(&grid, 3, 1.0);
        assert_eq!(grid.get(1, 1), 1.0);
        assert!(blurred.get(1, 1) < 1.0);
    }
}
