//! Power spectra for Gaussian random lensing fields.
//!
//! A [`PowerSpectrum`] maps an angular wavenumber `k` (radians per arcsec, i.e.
//! `2π` times the spatial frequency) to a power. The field generator in
//! [`crate::algo::lensing_field`] weights white noise in Fourier space by the
//! square root of this power.
//!
//! The atmospheric PSF model uses the von Kármán-like spectrum
//!
//! ```text
//! P(k) = (k² + (1/L0)²)^(-11/6) * exp(-(k * trunc)²)
//! ```
//!
//! with outer scale `L0 = 180` arcsec (Heymans et al. 2012 find roughly three
//! arcminutes) and a Gaussian high-k damping set by `trunc`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Outer scale of the turbulence spectrum in arcsec.
pub const OUTER_SCALE_ARCSEC: f64 = 180.0;

/// Default high-k truncation scale in arcsec.
pub const DEFAULT_TRUNC_ARCSEC: f64 = 10.0;

/// Isotropic power spectrum evaluated at angular wavenumber `k`.
pub trait PowerSpectrum {
    /// Power at wavenumber `k` (radians per arcsec). Must be finite and non-negative.
    fn power(&self, k: f64) -> f64;
}

impl<F> PowerSpectrum for F
where
    F: Fn(f64) -> f64,
{
    fn power(&self, k: f64) -> f64 {
        self(k)
    }
}

/// Turbulence-like spectrum with an outer scale and Gaussian truncation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceSpectrum {
    /// Outer scale `L0` in arcsec
    pub outer_scale: f64,
    /// Damping scale in arcsec; larger values suppress more small-scale power
    pub trunc: f64,
}

impl TurbulenceSpectrum {
    /// Spectrum with the standard 180 arcsec outer scale.
    pub fn new(trunc: f64) -> Self {
        Self {
            outer_scale: OUTER_SCALE_ARCSEC,
            trunc,
        }
    }
}

impl Default for TurbulenceSpectrum {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNC_ARCSEC)
    }
}

impl PowerSpectrum for TurbulenceSpectrum {
    fn power(&self, k: f64) -> f64 {
        let k0 = 1.0 / self.outer_scale;
        (k * k + k0 * k0).powf(-11.0 / 6.0) * (-(k * self.trunc).powi(2)).exp()
    }
}

/// Angular wavenumbers of an `n`-point FFT with sample `spacing`.
///
/// Follows the usual FFT ordering: non-negative frequencies first, then the
/// negative ones, each multiplied by `2π / (n * spacing)`.
pub fn fft_wavenumbers(n: usize, spacing: f64) -> Vec<f64> {
    let dk = 2.0 * PI / (n as f64 * spacing);
    (0..n)
        .map(|i| {
            let signed = if i <= (n - 1) / 2 {
                i as f64
            } else {
                i as f64 - n as f64
            };
            signed * dk
        })
        .collect()
}
