//! Interpolation on square, regularly spaced 2D grids.
//!
//! Grids are centred on the origin: node `(i, j)` of an `n x n` grid with
//! spacing `d` sits at `((i - (n-1)/2) * d, (j - (n-1)/2) * d)`. Data arrays are
//! indexed as `[y_index, x_index]`.
//!
//! Two interpolants are available. [`Interpolant::Cubic`] is Catmull-Rom cubic
//! convolution (C¹ continuous, exact at the nodes, reproduces linear functions).
//! [`Interpolant::Bilinear`] is the usual four-corner blend.
//!
//! Positions beyond the outermost nodes are handled by a [`BoundaryPolicy`]:
//! `Clamp` pins them to the nearest edge, `Reject` returns
//! [`InterpolationError::OutOfBounds`].

use clap::ValueEnum;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for grid construction and interpolation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Coordinate is outside the valid interpolation domain
    #[error("{axis} coordinate {value} is outside valid range [{min}, {max}]")]
    OutOfBounds {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("grid needs at least 2 points per side, got {0}")]
    TooFewPoints(usize),
    #[error("grid spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    /// Data array does not match the grid geometry
    #[error("data shape {data_shape:?} does not match a {n}x{n} grid")]
    DimensionMismatch {
        n: usize,
        data_shape: (usize, usize),
    },
}

/// Interpolation scheme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Interpolant {
    /// Four-point bilinear blend
    Bilinear,
    /// Catmull-Rom cubic convolution over a 4x4 neighbourhood
    #[default]
    Cubic,
}

/// What to do with positions outside the grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Clamp to the nearest edge node
    #[default]
    Clamp,
    /// Refuse to interpolate
    Reject,
}

/// Geometry of a square grid centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    n_grid: usize,
    spacing: f64,
}

impl GridSpec {
    /// Create a grid with `n_grid` nodes per side separated by `spacing`.
    ///
    /// # Errors
    /// * `TooFewPoints` if `n_grid < 2`
    /// * `InvalidSpacing` if `spacing` is not a positive finite number
    pub fn new(n_grid: usize, spacing: f64) -> Result<Self, InterpolationError> {
        if n_grid < 2 {
            return Err(InterpolationError::TooFewPoints(n_grid));
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(InterpolationError::InvalidSpacing(spacing));
        }
        Ok(Self { n_grid, spacing })
    }

    pub fn n_grid(&self) -> usize {
        self.n_grid
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Side length of the periodic patch the grid samples (`n_grid * spacing`).
    pub fn extent(&self) -> f64 {
        self.n_grid as f64 * self.spacing
    }

    /// Coordinate of the outermost node on the positive side.
    pub fn half_width(&self) -> f64 {
        0.5 * (self.n_grid - 1) as f64 * self.spacing
    }

    /// Coordinate of node `index` along either axis.
    pub fn node_coordinate(&self, index: usize) -> f64 {
        index as f64 * self.spacing - self.half_width()
    }
}

/// Fractional grid position produced by [`GridInterpolator::locate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// Fractional column index, within `[0, n-1]`
    pub fx: f64,
    /// Fractional row index, within `[0, n-1]`
    pub fy: f64,
}

/// Interpolator for data laid out on a [`GridSpec`].
///
/// Several arrays sharing one geometry can be sampled at the same location:
/// [`locate`](Self::locate) once, then [`sample`](Self::sample) each array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridInterpolator {
    spec: GridSpec,
    interpolant: Interpolant,
    boundary: BoundaryPolicy,
}

impl GridInterpolator {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            interpolant: Interpolant::default(),
            boundary: BoundaryPolicy::default(),
        }
    }

    pub fn with_interpolant(mut self, interpolant: Interpolant) -> Self {
        self.interpolant = interpolant;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn interpolant(&self) -> Interpolant {
        self.interpolant
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    fn fractional_index(&self, value: f64, axis: &'static str) -> Result<f64, InterpolationError> {
        let max_index = (self.spec.n_grid - 1) as f64;
        let f = value / self.spec.spacing + 0.5 * max_index;

        if (0.0..=max_index).contains(&f) {
            return Ok(f);
        }

        match self.boundary {
            // NaN falls through clamp unchanged, so it is rejected as well
            BoundaryPolicy::Clamp if !f.is_nan() => Ok(f.clamp(0.0, max_index)),
            _ => Err(InterpolationError::OutOfBounds {
                axis,
                value,
                min: -self.spec.half_width(),
                max: self.spec.half_width(),
            }),
        }
    }

    /// Map a continuous position to a fractional grid index.
    pub fn locate(&self, x: f64, y: f64) -> Result<GridPoint, InterpolationError> {
        Ok(GridPoint {
            fx: self.fractional_index(x, "X")?,
            fy: self.fractional_index(y, "Y")?,
        })
    }

    /// Interpolate `data` at a located grid point.
    ///
    /// `data` must have shape `(n_grid, n_grid)`; use [`check_shape`](Self::check_shape)
    /// when that is not guaranteed by construction.
    pub fn sample(&self, data: &Array2<f64>, point: GridPoint) -> f64 {
        match self.interpolant {
            Interpolant::Bilinear => self.sample_bilinear(data, point),
            Interpolant::Cubic => self.sample_cubic(data, point),
        }
    }

    /// Locate and sample in one step.
    pub fn interpolate(&self, data: &Array2<f64>, x: f64, y: f64) -> Result<f64, InterpolationError> {
        self.check_shape(data)?;
        let point = self.locate(x, y)?;
        Ok(self.sample(data, point))
    }

    pub fn check_shape(&self, data: &Array2<f64>) -> Result<(), InterpolationError> {
        let n = self.spec.n_grid;
        if data.dim() != (n, n) {
            return Err(InterpolationError::DimensionMismatch {
                n,
                data_shape: data.dim(),
            });
        }
        Ok(())
    }

    /// Lower node index and weight toward the upper node.
    ///
    /// The last node maps to the final interval with weight 1 so that a
    /// neighbour always exists on the upper side.
    fn cell(&self, f: f64) -> (usize, f64) {
        let last_cell = self.spec.n_grid - 2;
        let i0 = (f.floor() as usize).min(last_cell);
        (i0, f - i0 as f64)
    }

    fn sample_bilinear(&self, data: &Array2<f64>, point: GridPoint) -> f64 {
        let (x0, wx) = self.cell(point.fx);
        let (y0, wy) = self.cell(point.fy);

        let q11 = data[[y0, x0]];
        let q12 = data[[y0 + 1, x0]];
        let q21 = data[[y0, x0 + 1]];
        let q22 = data[[y0 + 1, x0 + 1]];

        q11 * (1.0 - wx) * (1.0 - wy)
            + q21 * wx * (1.0 - wy)
            + q12 * (1.0 - wx) * wy
            + q22 * wx * wy
    }

    fn sample_cubic(&self, data: &Array2<f64>, point: GridPoint) -> f64 {
        let (x0, tx) = self.cell(point.fx);
        let (y0, ty) = self.cell(point.fy);
        let last = (self.spec.n_grid - 1) as isize;

        let mut value = 0.0;
        for dy in -1..=2isize {
            let wy = catmull_rom(ty - dy as f64);
            if wy == 0.0 {
                continue;
            }
            let row = (y0 as isize + dy).clamp(0, last) as usize;
            for dx in -1..=2isize {
                let wx = catmull_rom(tx - dx as f64);
                if wx == 0.0 {
                    continue;
                }
                let col = (x0 as isize + dx).clamp(0, last) as usize;
                value += wx * wy * data[[row, col]];
            }
        }
        value
    }
}

/// Catmull-Rom cubic convolution kernel (Keys, a = -0.5).
fn catmull_rom(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        (1.5 * t - 2.5) * t * t + 1.0
    } else if t < 2.0 {
        ((-0.5 * t + 2.5) * t - 4.0) * t + 2.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filled_grid(n: usize, spacing: f64, f: impl Fn(f64, f64) -> f64) -> (GridSpec, Array2<f64>) {
        let spec = GridSpec::new(n, spacing).unwrap();
        let data = Array2::from_shape_fn((n, n), |(row, col)| {
            f(spec.node_coordinate(col), spec.node_coordinate(row))
        });
        (spec, data)
    }

    #[test]
    fn test_grid_spec_rejects_degenerate_grids() {
        assert_eq!(
            GridSpec::new(0, 1.0),
            Err(InterpolationError::TooFewPoints(0))
        );
        assert_eq!(
            GridSpec::new(1, 1.0),
            Err(InterpolationError::TooFewPoints(1))
        );
        assert!(matches!(
            GridSpec::new(8, 0.0),
            Err(InterpolationError::InvalidSpacing(_))
        ));
        assert!(matches!(
            GridSpec::new(8, -2.0),
            Err(InterpolationError::InvalidSpacing(_))
        ));
        assert!(GridSpec::new(8, f64::NAN).is_err());
        assert!(GridSpec::new(8, f64::INFINITY).is_err());
    }

    #[test]
    fn test_grid_spec_geometry() {
        let spec = GridSpec::new(5, 2.0).unwrap();
        assert_relative_eq!(spec.extent(), 10.0);
        assert_relative_eq!(spec.half_width(), 4.0);
        assert_relative_eq!(spec.node_coordinate(0), -4.0);
        assert_relative_eq!(spec.node_coordinate(2), 0.0);
        assert_relative_eq!(spec.node_coordinate(4), 4.0);
    }

    #[test]
    fn test_exact_grid_points() {
        let (spec, data) = filled_grid(6, 1.5, |x, y| x * x - 3.0 * y + x * y);
        for interpolant in [Interpolant::Bilinear, Interpolant::Cubic] {
            let interp = GridInterpolator::new(spec).with_interpolant(interpolant);
            for row in 0..6 {
                for col in 0..6 {
                    let x = spec.node_coordinate(col);
                    let y = spec.node_coordinate(row);
                    assert_relative_eq!(
                        interp.interpolate(&data, x, y).unwrap(),
                        data[[row, col]],
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_bilinear_midpoints() {
        let (spec, data) = filled_grid(3, 1.0, |x, y| x + y);
        let interp = GridInterpolator::new(spec).with_interpolant(Interpolant::Bilinear);

        assert_relative_eq!(interp.interpolate(&data, -0.5, -1.0).unwrap(), -1.5, epsilon = 1e-12);
        assert_relative_eq!(interp.interpolate(&data, 0.5, 0.5).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(interp.interpolate(&data, 0.25, -0.75).unwrap(), -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_reproduces_linear_interior() {
        let (spec, data) = filled_grid(8, 0.5, |x, y| 2.0 * x - 0.5 * y + 1.0);
        let interp = GridInterpolator::new(spec);

        // stay at least one node away from the edges
        for &(x, y) in &[(0.1, -0.3), (-0.77, 0.4), (0.9, 0.9), (-1.2, -1.1)] {
            assert_relative_eq!(
                interp.interpolate(&data, x, y).unwrap(),
                2.0 * x - 0.5 * y + 1.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_cubic_is_smooth_across_nodes() {
        let (spec, data) = filled_grid(10, 1.0, |x, y| (0.3 * x).sin() * (0.2 * y).cos());
        let interp = GridInterpolator::new(spec);

        // one-sided slopes around an interior node agree to first order
        let h = 1e-5;
        let node = spec.node_coordinate(5);
        let left = (interp.interpolate(&data, node, 0.0).unwrap()
            - interp.interpolate(&data, node - h, 0.0).unwrap())
            / h;
        let right = (interp.interpolate(&data, node + h, 0.0).unwrap()
            - interp.interpolate(&data, node, 0.0).unwrap())
            / h;
        assert_relative_eq!(left, right, epsilon = 1e-3);
    }

    #[test]
    fn test_reject_out_of_bounds() {
        let (spec, data) = filled_grid(4, 1.0, |x, _| x);
        let interp = GridInterpolator::new(spec).with_boundary(BoundaryPolicy::Reject);

        assert!(interp.interpolate(&data, 1.5, 0.0).is_ok());
        assert!(matches!(
            interp.interpolate(&data, 1.6, 0.0),
            Err(InterpolationError::OutOfBounds { axis: "X", .. })
        ));
        assert!(matches!(
            interp.interpolate(&data, 0.0, -1.6),
            Err(InterpolationError::OutOfBounds { axis: "Y", .. })
        ));
        assert!(interp.interpolate(&data, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_clamp_returns_edge_values() {
        let (spec, data) = filled_grid(4, 1.0, |x, y| x + 10.0 * y);
        for interpolant in [Interpolant::Bilinear, Interpolant::Cubic] {
            let interp = GridInterpolator::new(spec).with_interpolant(interpolant);
            assert_relative_eq!(
                interp.interpolate(&data, 100.0, -100.0).unwrap(),
                data[[0, 3]],
                epsilon = 1e-12
            );
            assert_relative_eq!(
                interp.interpolate(&data, -7.0, 0.5).unwrap(),
                interp.interpolate(&data, -1.5, 0.5).unwrap(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let spec = GridSpec::new(4, 1.0).unwrap();
        let interp = GridInterpolator::new(spec);
        let data = Array2::zeros((4, 3));

        assert!(matches!(
            interp.interpolate(&data, 0.0, 0.0),
            Err(InterpolationError::DimensionMismatch { n: 4, .. })
        ));
    }

    #[test]
    fn test_catmull_rom_partition_of_unity() {
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let total: f64 = (-1..=2).map(|j| catmull_rom(t - j as f64)).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }
}
