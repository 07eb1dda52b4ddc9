//! Construction-time configuration for power-spectrum PSFs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::PsfError;
use crate::algo::grid_interp::{BoundaryPolicy, GridSpec, Interpolant};
use crate::algo::lensing_field::FieldError;
use crate::algo::power_spectrum::DEFAULT_TRUNC_ARCSEC;

/// Parameters shared by every realization of a power-spectrum PSF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsfConfig {
    /// Image side length in pixels
    pub image_width: usize,
    /// Pixel scale in arcsec per pixel
    pub pixel_scale: f64,
    /// High-k truncation scale of the turbulence spectrum in arcsec
    pub trunc: f64,
    /// Number of independent realizations summed into the effective PSF
    pub n_coadd_psf: usize,
    /// Lensing-field grid points per side
    pub n_grid: usize,
    /// Total shear variance `var(g1) + var(g2)` of each field
    pub target_variance: f64,
    pub interpolant: Interpolant,
    pub boundary: BoundaryPolicy,
}

impl Default for PsfConfig {
    fn default() -> Self {
        Self {
            image_width: 225,
            pixel_scale: 0.263,
            trunc: DEFAULT_TRUNC_ARCSEC,
            n_coadd_psf: 1,
            n_grid: 64,
            target_variance: 1e-4,
            interpolant: Interpolant::Cubic,
            boundary: BoundaryPolicy::Clamp,
        }
    }
}

impl PsfConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn validate(&self) -> Result<(), PsfError> {
        if self.image_width == 0 {
            return Err(PsfError::InvalidConfig(
                "image_width must be at least one pixel".to_string(),
            ));
        }
        if !(self.pixel_scale.is_finite() && self.pixel_scale > 0.0) {
            return Err(PsfError::InvalidConfig(format!(
                "pixel_scale must be positive, got {}",
                self.pixel_scale
            )));
        }
        if !(self.trunc.is_finite() && self.trunc > 0.0) {
            return Err(PsfError::InvalidConfig(format!(
                "trunc must be positive, got {}",
                self.trunc
            )));
        }
        if self.n_coadd_psf == 0 {
            return Err(PsfError::InvalidConfig(
                "n_coadd_psf must be at least one".to_string(),
            ));
        }
        if !(self.target_variance.is_finite() && self.target_variance >= 0.0) {
            return Err(FieldError::InvalidVariance(self.target_variance).into());
        }
        self.grid_spec()?;
        Ok(())
    }

    /// Pixel coordinate of the image centre (0-based pixel centres).
    pub fn image_center(&self) -> f64 {
        (self.image_width as f64 - 1.0) / 2.0
    }

    /// Image side length in arcsec.
    pub fn image_extent(&self) -> f64 {
        self.image_width as f64 * self.pixel_scale
    }

    /// Lensing grid covering the image, with spacing of at least one arcsec.
    pub fn grid_spec(&self) -> Result<GridSpec, FieldError> {
        let intervals = self.n_grid.saturating_sub(1).max(1) as f64;
        let spacing = (self.image_extent() / intervals).max(1.0);
        GridSpec::new(self.n_grid, spacing).map_err(FieldError::InvalidGrid)
    }
}
