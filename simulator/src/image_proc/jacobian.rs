//! Local linear mapping from pixel offsets to world (arcsec) offsets.

use nalgebra::{Matrix2, Vector2};

/// Pixel-to-world Jacobian `[[du/dx, du/dy], [dv/dx, dv/dy]]` in arcsec per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jacobian {
    matrix: Matrix2<f64>,
}

impl Jacobian {
    pub fn new(dudx: f64, dudy: f64, dvdx: f64, dvdy: f64) -> Self {
        Self {
            matrix: Matrix2::new(dudx, dudy, dvdx, dvdy),
        }
    }

    /// Square pixels of side `pixel_scale` arcsec with no rotation.
    pub fn scale(pixel_scale: f64) -> Self {
        Self::new(pixel_scale, 0.0, 0.0, pixel_scale)
    }

    pub fn matrix(&self) -> &Matrix2<f64> {
        &self.matrix
    }

    /// Solid angle of one pixel in square arcsec.
    pub fn pixel_area(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// World offset of a pixel offset `(dx, dy)`.
    pub fn to_world(&self, dx: f64, dy: f64) -> Vector2<f64> {
        self.matrix * Vector2::new(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_scale_jacobian() {
        let jac = Jacobian::scale(0.263);
        assert_relative_eq!(jac.pixel_area(), 0.263 * 0.263, epsilon = 1e-15);

        let w = jac.to_world(2.0, -1.0);
        assert_relative_eq!(w.x, 0.526, epsilon = 1e-15);
        assert_relative_eq!(w.y, -0.263, epsilon = 1e-15);
    }

    #[test]
    fn test_general_jacobian_area() {
        let jac = Jacobian::new(0.2, 0.05, -0.05, 0.2);
        assert_relative_eq!(jac.pixel_area(), 0.04 + 0.0025, epsilon = 1e-15);
    }
}
