//! Quadratic model of PSF size variation across the image.
//!
//! The FWHM (arcsec) at pixel `(x, y)` is
//!
//! ```text
//! fwhm = c0 + c1 x' + c2 y' + c3 x'² + c4 x'y' + c5 y'²
//! ```
//!
//! with `x' = (x - c) * 2 / (image_width * pixel_scale)` and likewise for `y'`,
//! where `c` is the image centre in pixels.
//!
//! Coefficients are drawn once per realization: `c0` from a log-normal with mean
//! 0.9 and standard deviation 0.1, the linear terms from `N(m, 0.001)` and the
//! quadratic terms from `N(m / 10, 0.001)` with `m = 0.004 * 10 / trunc`.
//!
//! Nothing keeps the surface positive far from the centre; callers building
//! profiles must reject non-positive values.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};

use super::{PsfConfig, PsfError};

/// Target mean of the central FWHM in arcsec.
pub const FWHM_CENTRAL_MEAN: f64 = 0.9;
/// Target standard deviation of the central FWHM in arcsec.
pub const FWHM_CENTRAL_SIGMA: f64 = 0.1;
/// Standard deviation of the polynomial coefficients.
pub const FWHM_COEFF_SIGMA: f64 = 0.001;
/// Mean of the linear coefficients at `trunc = 10` arcsec.
const FWHM_LINEAR_MEAN: f64 = 0.02 / 5.0;

/// Log-space `(mu, sigma)` of a log-normal with the given linear mean and standard deviation.
pub fn lognormal_params(mean: f64, sigma: f64) -> (f64, f64) {
    let log_var = (1.0 + sigma * sigma / (mean * mean)).ln();
    (mean.ln() - 0.5 * log_var, log_var.sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeModel {
    coefficients: [f64; 6],
    center: f64,
    coord_scale: f64,
}

impl SizeModel {
    /// Model with explicit coefficients `[c0, c_x, c_y, c_xx, c_xy, c_yy]`.
    pub fn from_coefficients(coefficients: [f64; 6], image_width: usize, pixel_scale: f64) -> Self {
        Self {
            coefficients,
            center: (image_width as f64 - 1.0) / 2.0,
            coord_scale: 2.0 / (image_width as f64 * pixel_scale),
        }
    }

    /// Draw coefficients from the priors, in the order c0, c_x, c_y, c_xx, c_xy, c_yy.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, config: &PsfConfig) -> Result<Self, PsfError> {
        let (log_mean, log_sigma) = lognormal_params(FWHM_CENTRAL_MEAN, FWHM_CENTRAL_SIGMA);
        let central = LogNormal::new(log_mean, log_sigma)
            .map_err(|e| PsfError::InvalidConfig(e.to_string()))?;

        let linear_mean = FWHM_LINEAR_MEAN * 10.0 / config.trunc;
        let linear = Normal::new(linear_mean, FWHM_COEFF_SIGMA)
            .map_err(|e| PsfError::InvalidConfig(e.to_string()))?;
        let quadratic = Normal::new(linear_mean / 10.0, FWHM_COEFF_SIGMA)
            .map_err(|e| PsfError::InvalidConfig(e.to_string()))?;

        let coefficients = [
            central.sample(rng),
            linear.sample(rng),
            linear.sample(rng),
            quadratic.sample(rng),
            quadratic.sample(rng),
            quadratic.sample(rng),
        ];

        Ok(Self::from_coefficients(
            coefficients,
            config.image_width,
            config.pixel_scale,
        ))
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }

    /// Normalized polynomial coordinates of pixel `(x, y)`.
    pub fn normalized(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.center) * self.coord_scale,
            (y - self.center) * self.coord_scale,
        )
    }

    /// FWHM in arcsec at pixel `(x, y)`.
    pub fn fwhm_at(&self, x: f64, y: f64) -> f64 {
        let (xs, ys) = self.normalized(x, y);
        let [c0, cx, cy, cxx, cxy, cyy] = self.coefficients;
        c0 + cx * xs + cy * ys + cxx * xs * xs + cxy * xs * ys + cyy * ys * ys
    }

    /// Partial derivatives of the FWHM with respect to pixel `x` and `y`.
    pub fn gradient_at(&self, x: f64, y: f64) -> (f64, f64) {
        let (xs, ys) = self.normalized(x, y);
        let [_, cx, cy, cxx, cxy, cyy] = self.coefficients;
        (
            self.coord_scale * (cx + 2.0 * cxx * xs + cxy * ys),
            self.coord_scale * (cy + cxy * xs + 2.0 * cyy * ys),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lognormal_params_recover_moments() {
        let (mu, sigma) = lognormal_params(0.9, 0.1);
        let mean = (mu + 0.5 * sigma * sigma).exp();
        let var = ((sigma * sigma).exp() - 1.0) * (2.0 * mu + sigma * sigma).exp();
        assert_relative_eq!(mean, 0.9, epsilon = 1e-12);
        assert_relative_eq!(var.sqrt(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_center_value_is_constant_term() {
        let model = SizeModel::from_coefficients([0.85, 0.1, -0.2, 0.03, 0.04, 0.05], 225, 0.263);
        assert_relative_eq!(model.fwhm_at(112.0, 112.0), 0.85);
        assert_eq!(model.normalized(112.0, 112.0), (0.0, 0.0));
    }

    #[test]
    fn test_closed_form_polynomial() {
        let coeffs = [0.9, 0.01, 0.02, 0.003, -0.004, 0.005];
        let model = SizeModel::from_coefficients(coeffs, 101, 0.5);
        let (x, y) = (80.0, 10.0);
        let xs = (x - 50.0) * 2.0 / 50.5;
        let ys = (y - 50.0) * 2.0 / 50.5;
        let expected = 0.9 + 0.01 * xs + 0.02 * ys + 0.003 * xs * xs - 0.004 * xs * ys
            + 0.005 * ys * ys;
        assert_relative_eq!(model.fwhm_at(x, y), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let model = SizeModel::from_coefficients([0.9, 0.01, -0.02, 0.3, 0.2, -0.1], 225, 0.263);
        let h = 1e-4;
        for &(x, y) in &[(0.0, 0.0), (112.0, 112.0), (30.5, 190.25), (224.0, 5.0)] {
            let (gx, gy) = model.gradient_at(x, y);
            let fx = (model.fwhm_at(x + h, y) - model.fwhm_at(x - h, y)) / (2.0 * h);
            let fy = (model.fwhm_at(x, y + h) - model.fwhm_at(x, y - h)) / (2.0 * h);
            assert_relative_eq!(gx, fx, epsilon = 1e-8);
            assert_relative_eq!(gy, fy, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_draw_is_deterministic() {
        let config = PsfConfig::default();
        let a = SizeModel::draw(&mut StdRng::seed_from_u64(17), &config).unwrap();
        let b = SizeModel::draw(&mut StdRng::seed_from_u64(17), &config).unwrap();
        assert_eq!(a, b);

        let c = SizeModel::draw(&mut StdRng::seed_from_u64(18), &config).unwrap();
        assert_ne!(a.coefficients(), c.coefficients());
    }

    #[test]
    fn test_prior_moments() {
        let config = PsfConfig {
            trunc: 5.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 4000;
        let draws: Vec<SizeModel> = (0..n)
            .map(|_| SizeModel::draw(&mut rng, &config).unwrap())
            .collect();

        let mean = |i: usize| draws.iter().map(|m| m.coefficients()[i]).sum::<f64>() / n as f64;

        assert_relative_eq!(mean(0), 0.9, epsilon = 0.01);
        // linear mean scales as 10 / trunc
        assert_relative_eq!(mean(1), 0.008, epsilon = 1e-4);
        assert_relative_eq!(mean(2), 0.008, epsilon = 1e-4);
        assert_relative_eq!(mean(4), 0.0008, epsilon = 1e-4);

        let central_sd = (draws
            .iter()
            .map(|m| (m.coefficients()[0] - mean(0)).powi(2))
            .sum::<f64>()
            / n as f64)
            .sqrt();
        assert_relative_eq!(central_sd, 0.1, epsilon = 0.01);
        assert!(draws.iter().all(|m| m.coefficients()[0] > 0.0));
    }
}
