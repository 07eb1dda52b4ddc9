//! Gaussian random lensing fields drawn from a power spectrum.
//!
//! A [`LensingField`] holds shear (`g1`, `g2`) and convergence (`kappa`) grids
//! realized from a [`PowerSpectrum`] and answers "shear and magnification at a
//! position" queries by interpolating those grids.
//!
//! # Sampling algorithm
//!
//! 1. Draw two independent real white-noise grids (E and B channels), `N(0, 1)`
//!    per node, from a `StdRng` seeded with the caller's seed.
//! 2. Forward 2D FFT each channel.
//! 3. Scale every mode by `sqrt(P(|k|) / A)` where `A` is the patch area. The
//!    `k = 0` mode is dropped (zero-mean field), as are the Nyquist modes of even
//!    grids, whose shear rotation would otherwise break Hermitian symmetry.
//! 4. Rotate into shear: with `φ = atan2(ky, kx)`,
//!    `g1 = cos2φ E - sin2φ B`, `g2 = sin2φ E + cos2φ B`, `kappa = E`.
//! 5. Inverse 2D FFT and keep the real parts.
//! 6. Optionally rescale all three grids so that `var(g1) + var(g2)` equals the
//!    requested variance.

use log::{debug, warn};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rustfft::{num_complex::Complex64, FftPlanner};
use thiserror::Error;

use super::grid_interp::{
    BoundaryPolicy, GridInterpolator, GridSpec, Interpolant, InterpolationError,
};
use super::power_spectrum::{fft_wavenumbers, PowerSpectrum};

/// Errors raised while building or querying a lensing field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("invalid field grid: {0}")]
    InvalidGrid(InterpolationError),
    #[error("target variance must be finite and non-negative, got {0}")]
    InvalidVariance(f64),
    #[error("power spectrum returned {power} at k = {k}")]
    InvalidPower { k: f64, power: f64 },
    #[error("position outside the lensing field: {0}")]
    OutOfDomain(InterpolationError),
    #[error("lensing is not weak at this position (kappa = {kappa}, g1 = {g1}, g2 = {g2})")]
    StrongLensing { kappa: f64, g1: f64, g2: f64 },
}

/// Lensing quantities at a single position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensingSample {
    pub g1: f64,
    pub g2: f64,
    pub kappa: f64,
    pub mu: f64,
}

/// Weak-lensing magnification `1 / ((1 - kappa)^2 - g1^2 - g2^2)`.
///
/// ```
/// use shearsim::algo::lensing_field::magnification;
///
/// assert_eq!(magnification(0.0, 0.0, 0.0), 1.0);
/// ```
pub fn magnification(kappa: f64, g1: f64, g2: f64) -> f64 {
    1.0 / lensing_determinant(kappa, g1, g2)
}

fn lensing_determinant(kappa: f64, g1: f64, g2: f64) -> f64 {
    (1.0 - kappa).powi(2) - g1 * g1 - g2 * g2
}

/// Realized shear and convergence grids plus their interpolator.
#[derive(Debug, Clone)]
pub struct LensingField {
    interp: GridInterpolator,
    g1: Array2<f64>,
    g2: Array2<f64>,
    kappa: Array2<f64>,
}

impl LensingField {
    /// Realize a field from `spectrum` on `spec`.
    ///
    /// # Arguments
    /// * `spectrum` - Power spectrum shared by the E and B channels
    /// * `spec` - Grid geometry (spacing in arcsec)
    /// * `target_variance` - If set, rescale so `var(g1) + var(g2)` matches it
    /// * `seed` - Seed for the white-noise draws
    ///
    /// # Errors
    /// * `InvalidVariance` for a negative or non-finite target
    /// * `InvalidPower` if the spectrum returns a negative or non-finite value
    pub fn build<P: PowerSpectrum + ?Sized>(
        spectrum: &P,
        spec: GridSpec,
        target_variance: Option<f64>,
        seed: u64,
    ) -> Result<Self, FieldError> {
        if let Some(variance) = target_variance {
            if !variance.is_finite() || variance < 0.0 {
                return Err(FieldError::InvalidVariance(variance));
            }
        }

        let n = spec.n_grid();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut e_mode: Vec<Complex64> = (0..n * n)
            .map(|_| Complex64::new(rng.sample(StandardNormal), 0.0))
            .collect();
        let mut b_mode: Vec<Complex64> = (0..n * n)
            .map(|_| Complex64::new(rng.sample(StandardNormal), 0.0))
            .collect();

        let mut planner = FftPlanner::new();
        fft2(&mut e_mode, n, &mut planner, false);
        fft2(&mut b_mode, n, &mut planner, false);

        let ks = fft_wavenumbers(n, spec.spacing());
        let area = spec.extent() * spec.extent();
        let nyquist = (n % 2 == 0).then_some(n / 2);

        let zero = Complex64::new(0.0, 0.0);
        let mut g1_k = vec![zero; n * n];
        let mut g2_k = vec![zero; n * n];
        let mut kappa_k = vec![zero; n * n];

        for row in 0..n {
            for col in 0..n {
                if (row == 0 && col == 0) || nyquist == Some(row) || nyquist == Some(col) {
                    continue;
                }
                let (kx, ky) = (ks[col], ks[row]);
                let k2 = kx * kx + ky * ky;
                let k = k2.sqrt();
                let power = spectrum.power(k);
                if !power.is_finite() || power < 0.0 {
                    return Err(FieldError::InvalidPower { k, power });
                }

                let amplitude = (power / area).sqrt();
                let cos2phi = (kx * kx - ky * ky) / k2;
                let sin2phi = 2.0 * kx * ky / k2;

                let idx = row * n + col;
                let e = e_mode[idx] * amplitude;
                let b = b_mode[idx] * amplitude;
                g1_k[idx] = e * cos2phi - b * sin2phi;
                g2_k[idx] = e * sin2phi + b * cos2phi;
                kappa_k[idx] = e;
            }
        }

        let mut g1 = inverse_real(g1_k, n, &mut planner);
        let mut g2 = inverse_real(g2_k, n, &mut planner);
        let mut kappa = inverse_real(kappa_k, n, &mut planner);

        let raw_variance = g1.var(0.0) + g2.var(0.0);
        match target_variance {
            Some(target) if raw_variance > 0.0 => {
                let factor = (target / raw_variance).sqrt();
                debug!(
                    "Lensing field {n}x{n} (spacing {:.3}): raw shear variance {raw_variance:.3e}, rescale factor {factor:.3e}",
                    spec.spacing()
                );
                g1.mapv_inplace(|v| v * factor);
                g2.mapv_inplace(|v| v * factor);
                kappa.mapv_inplace(|v| v * factor);
            }
            Some(target) if target > 0.0 => warn!(
                "Lensing field has zero shear variance; requested variance {target:.3e} not reachable"
            ),
            _ => debug!(
                "Lensing field {n}x{n} (spacing {:.3}): shear variance {raw_variance:.3e}, not rescaled",
                spec.spacing()
            ),
        }

        Ok(Self {
            interp: GridInterpolator::new(spec),
            g1,
            g2,
            kappa,
        })
    }

    /// Select the interpolant and boundary policy used by queries.
    pub fn with_interpolation(mut self, interpolant: Interpolant, boundary: BoundaryPolicy) -> Self {
        self.interp = self
            .interp
            .with_interpolant(interpolant)
            .with_boundary(boundary);
        self
    }

    /// Shear, convergence and magnification at `(x, y)` (arcsec from the field centre).
    ///
    /// # Errors
    /// * `OutOfDomain` when the position is off the grid under `BoundaryPolicy::Reject`
    /// * `StrongLensing` when `(1 - kappa)^2 - |g|^2 <= 0`
    pub fn shear_and_magnification(&self, x: f64, y: f64) -> Result<LensingSample, FieldError> {
        let point = self.interp.locate(x, y).map_err(FieldError::OutOfDomain)?;
        let g1 = self.interp.sample(&self.g1, point);
        let g2 = self.interp.sample(&self.g2, point);
        let kappa = self.interp.sample(&self.kappa, point);

        if lensing_determinant(kappa, g1, g2) <= 0.0 {
            return Err(FieldError::StrongLensing { kappa, g1, g2 });
        }

        Ok(LensingSample {
            g1,
            g2,
            kappa,
            mu: magnification(kappa, g1, g2),
        })
    }

    pub fn spec(&self) -> &GridSpec {
        self.interp.spec()
    }

    pub fn interpolator(&self) -> &GridInterpolator {
        &self.interp
    }

    pub fn g1(&self) -> &Array2<f64> {
        &self.g1
    }

    pub fn g2(&self) -> &Array2<f64> {
        &self.g2
    }

    pub fn kappa(&self) -> &Array2<f64> {
        &self.kappa
    }

    /// Total shear variance `var(g1) + var(g2)` over the grid nodes.
    pub fn shear_variance(&self) -> f64 {
        self.g1.var(0.0) + self.g2.var(0.0)
    }
}

/// In-place 2D FFT of a row-major `n x n` buffer: rows, then columns.
fn fft2(data: &mut [Complex64], n: usize, planner: &mut FftPlanner<f64>, inverse: bool) {
    let fft = if inverse {
        planner.plan_fft_inverse(n)
    } else {
        planner.plan_fft_forward(n)
    };
    // process() transforms every length-n chunk, i.e. every row
    fft.process(data);
    transpose_square(data, n);
    fft.process(data);
    transpose_square(data, n);
}

fn transpose_square(data: &mut [Complex64], n: usize) {
    for row in 0..n {
        for col in row + 1..n {
            data.swap(row * n + col, col * n + row);
        }
    }
}

/// Inverse transform and take the normalized real part.
fn inverse_real(
    mut spectrum: Vec<Complex64>,
    n: usize,
    planner: &mut FftPlanner<f64>,
) -> Array2<f64> {
    fft2(&mut spectrum, n, planner, true);
    let norm = (n * n) as f64;
    Array2::from_shape_fn((n, n), |(row, col)| spectrum[row * n + col].re / norm)
}
