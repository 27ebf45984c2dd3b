//! Piecewise-linear height remapping.

use serde::{Deserialize, Serialize};

use super::grid::Grid;

/// Remaps heights through a sorted list of `(input, output)` keys.
///
/// Inputs before the first key or after the last take that key's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<(f32, f32)>,
}

impl HeightCurve {
    /// Builds a curve from control points; they are sorted by input.
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Identity over `[0, 1]`.
    pub fn linear() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    /// Flattens lowlands and steepens peaks.
    pub fn lowland_flatten() -> Self {
        Self::new(vec![(0.0, 0.0), (0.4, 0.3), (0.7, 0.65), (1.0, 1.0)])
    }

    pub fn keys(&self) -> &[(f32, f32)] {
        &self.keys
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return t,
        };
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if t <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                return y0 + (y1 - y0) * (t - x0) / span;
            }
        }
        last.1
    }

    /// Applies the curve to every cell.
    pub fn apply(&self, grid: &mut Grid) {
        for h in grid.as_mut_slice() {
            *h = self.evaluate(*h);
        }
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_is_identity() {
        let curve = HeightCurve::linear();
        for t in [0.0, 0.2, 0.5, 0.99, 1.0] {
            assert!((curve.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clamps_outside_keys() {
        let curve = HeightCurve::new(vec![(0.2, 0.1), (0.8, 0.9)]);
        assert_eq!(curve.evaluate(-1.0), 0.1);
        assert_eq!(curve.evaluate(2.0), 0.9);
        assert!((curve.evaluate(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unsorted_keys_are_sorted() {
        let curve = HeightCurve::new(vec![(1.0, 1.0), (0.0, 0.0), (0.5, 0.25)]);
        assert_eq!(curve.keys()[1], (0.5, 0.25));
        assert!((curve.evaluate(0.25) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_apply_to_grid() {
        let mut grid = Grid::filled(2, 2, 0.4).unwrap();
        HeightCurve::lowland_flatten().apply(&mut grid);
        assert!(grid.as_slice().iter().all(|&h| (h - 0.3).abs() < 1e-6));
    }
}
