//! A single realization of the power-spectrum PSF.
//!
//! Each realization owns one lensing field and one size model. The profile at
//! a pixel position is a `beta = 2.5` Moffat with the local FWHM, sheared by the
//! local `(g1, g2)` and then magnified by the local `mu`.
//!
//! Pixel `(x, y)` maps to field coordinates
//! `((x - c) * pixel_scale, (y - c) * pixel_scale)` arcsec with `c` the image
//! centre, so the field grid (see [`PsfConfig::grid_spec`]) covers the image.

use log::debug;
use once_cell::sync::OnceCell;
use rand::Rng;

use super::{PsfConfig, PsfError, SizeModel};
use crate::algo::lensing_field::{LensingField, LensingSample};
use crate::algo::power_spectrum::TurbulenceSpectrum;
use crate::image_proc::profile::Profile;

/// Power-law index of the atmospheric Moffat profile.
pub const MOFFAT_BETA: f64 = 2.5;

/// Exclusive upper bound of the per-realization field seed.
const FIELD_SEED_LIMIT: u64 = 1 << 30;

#[derive(Debug)]
pub struct PsfRealization {
    config: PsfConfig,
    spectrum: TurbulenceSpectrum,
    field_seed: u64,
    field: OnceCell<LensingField>,
    size_model: SizeModel,
}

impl PsfRealization {
    /// Draw a new realization from `rng`: first the field seed, then the size
    /// coefficients. The field itself is built on first use.
    pub fn new<R: Rng + ?Sized>(config: &PsfConfig, rng: &mut R) -> Result<Self, PsfError> {
        config.validate()?;
        let field_seed = rng.gen_range(1..FIELD_SEED_LIMIT);
        let size_model = SizeModel::draw(rng, config)?;
        Self::from_parts(config, field_seed, size_model)
    }

    /// Realization with an explicit field seed and size model.
    pub fn from_parts(
        config: &PsfConfig,
        field_seed: u64,
        size_model: SizeModel,
    ) -> Result<Self, PsfError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            spectrum: TurbulenceSpectrum::new(config.trunc),
            field_seed,
            field: OnceCell::new(),
            size_model,
        })
    }

    pub fn config(&self) -> &PsfConfig {
        &self.config
    }

    pub fn field_seed(&self) -> u64 {
        self.field_seed
    }

    pub fn size_model(&self) -> &SizeModel {
        &self.size_model
    }

    pub fn is_field_built(&self) -> bool {
        self.field.get().is_some()
    }

    /// The lensing field, built on first call. Concurrent first calls build it once.
    pub fn field(&self) -> Result<&LensingField, PsfError> {
        let field = self.field.get_or_try_init(|| {
            debug!("Building lensing field with seed {}", self.field_seed);
            let spec = self.config.grid_spec()?;
            LensingField::build(
                &self.spectrum,
                spec,
                Some(self.config.target_variance),
                self.field_seed,
            )
            .map(|field| field.with_interpolation(self.config.interpolant, self.config.boundary))
        })?;
        Ok(field)
    }

    /// Field coordinates (arcsec from the field centre) of pixel `(x, y)`.
    pub fn field_coords(&self, x: f64, y: f64) -> (f64, f64) {
        let center = self.config.image_center();
        (
            (x - center) * self.config.pixel_scale,
            (y - center) * self.config.pixel_scale,
        )
    }

    /// Shear, convergence and magnification at pixel `(x, y)`.
    pub fn lensing_at(&self, x: f64, y: f64) -> Result<LensingSample, PsfError> {
        let (u, v) = self.field_coords(x, y);
        Ok(self.field()?.shear_and_magnification(u, v)?)
    }

    /// FWHM in arcsec at pixel `(x, y)`.
    pub fn fwhm_at(&self, x: f64, y: f64) -> f64 {
        self.size_model.fwhm_at(x, y)
    }

    /// Lensed Moffat PSF at pixel `(x, y)`, unit flux before magnification.
    ///
    /// # Errors
    /// * `NonPositiveFwhm` where the size polynomial drops to zero or below
    /// * any lensing-field error from [`lensing_at`](Self::lensing_at)
    pub fn profile_at(&self, x: f64, y: f64) -> Result<Profile, PsfError> {
        let fwhm = self.fwhm_at(x, y);
        if !(fwhm > 0.0) {
            return Err(PsfError::NonPositiveFwhm { x, y, fwhm });
        }
        let lensing = self.lensing_at(x, y)?;
        let profile = Profile::moffat(MOFFAT_BETA, fwhm, 1.0)?.lens(
            lensing.g1,
            lensing.g2,
            lensing.mu,
        )?;
        Ok(profile)
    }
}
