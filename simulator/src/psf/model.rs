//! PSF family selection and PSF stamp rendering.
//!
//! Two families are available:
//!
//! * `gauss` - a constant round Gaussian with 0.9 arcsec FWHM
//! * `ps` - the power-spectrum model of [`StackedPsf`]
//!
//! [`PsfModel::render_at`] draws a 21x21 pixel-integrated stamp of the PSF at a
//! position, normalized to unit sum, together with the noise level that puts
//! the stamp at a signal-to-noise of 500.

use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

use super::{PsfConfig, PsfError, StackedPsf};
use crate::image_proc::jacobian::Jacobian;
use crate::image_proc::profile::Profile;

/// FWHM of the constant Gaussian PSF in arcsec.
pub const GAUSS_PSF_FWHM: f64 = 0.9;

/// Side length in pixels of rendered PSF stamps.
pub const PSF_STAMP_SIZE: usize = 21;

/// Signal-to-noise the PSF stamp noise estimate is tuned for.
pub const TARGET_PSF_S2N: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsfType {
    Gauss,
    PowerSpectrum,
}

impl FromStr for PsfType {
    type Err = PsfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauss" => Ok(PsfType::Gauss),
            "ps" => Ok(PsfType::PowerSpectrum),
            other => Err(PsfError::UnknownPsfType(other.to_string())),
        }
    }
}

impl fmt::Display for PsfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsfType::Gauss => write!(f, "gauss"),
            PsfType::PowerSpectrum => write!(f, "ps"),
        }
    }
}

/// A rendered PSF stamp.
#[derive(Debug, Clone)]
pub struct PsfImage {
    /// Pixel-integrated PSF, normalized to unit sum
    pub image: Array2<f64>,
    /// Local pixel-to-world mapping the stamp was drawn with
    pub jacobian: Jacobian,
    /// Per-pixel noise for a stamp signal-to-noise of [`TARGET_PSF_S2N`]
    pub noise: f64,
    /// The analytic profile that was drawn
    pub profile: Profile,
}

impl PsfImage {
    /// Constant inverse-variance weight map matching `noise`.
    pub fn weight(&self) -> Array2<f64> {
        Array2::from_elem(self.image.dim(), 1.0 / (self.noise * self.noise))
    }

    /// `(row, col)` of the stamp centre.
    pub fn center(&self) -> (f64, f64) {
        let (ny, nx) = self.image.dim();
        ((ny as f64 - 1.0) / 2.0, (nx as f64 - 1.0) / 2.0)
    }
}

#[derive(Debug)]
pub enum PsfModel {
    Gauss { fwhm: f64 },
    PowerSpectrum(StackedPsf),
}

impl PsfModel {
    pub fn new(psf_type: PsfType, config: &PsfConfig, seed: u64) -> Result<Self, PsfError> {
        match psf_type {
            PsfType::Gauss => Ok(PsfModel::Gauss {
                fwhm: GAUSS_PSF_FWHM,
            }),
            PsfType::PowerSpectrum => Ok(PsfModel::PowerSpectrum(StackedPsf::new(
                config.clone(),
                seed,
            )?)),
        }
    }

    pub fn psf_type(&self) -> PsfType {
        match self {
            PsfModel::Gauss { .. } => PsfType::Gauss,
            PsfModel::PowerSpectrum(_) => PsfType::PowerSpectrum,
        }
    }

    /// Analytic PSF at pixel `(x, y)`.
    pub fn profile_at(&self, x: f64, y: f64) -> Result<Profile, PsfError> {
        match self {
            PsfModel::Gauss { fwhm } => Ok(Profile::gaussian(*fwhm, 1.0)?),
            PsfModel::PowerSpectrum(stack) => stack.stacked_profile_at(x, y),
        }
    }

    /// Render the normalized PSF stamp at pixel `(x, y)`.
    pub fn render_at(&self, x: f64, y: f64, jacobian: &Jacobian) -> Result<PsfImage, PsfError> {
        let profile = self.profile_at(x, y)?;
        let mut image = profile.draw_image(PSF_STAMP_SIZE, PSF_STAMP_SIZE, jacobian);

        let total = image.sum();
        if !(total > 0.0) {
            return Err(PsfError::EmptyStamp(total));
        }
        image /= total;

        let noise = (image.mapv(|v| v * v).sum() / (TARGET_PSF_S2N * TARGET_PSF_S2N)).sqrt();

        Ok(PsfImage {
            image,
            jacobian: *jacobian,
            noise,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_psf_type() {
        assert_eq!("gauss".parse::<PsfType>().unwrap(), PsfType::Gauss);
        assert_eq!("ps".parse::<PsfType>().unwrap(), PsfType::PowerSpectrum);
        assert_eq!(
            "real_psf".parse::<PsfType>().unwrap_err(),
            PsfError::UnknownPsfType("real_psf".to_string())
        );
        assert_eq!(PsfType::PowerSpectrum.to_string(), "ps");
    }

    #[test]
    fn test_gauss_stamp_is_normalized() {
        let model = PsfModel::new(PsfType::Gauss, &PsfConfig::default(), 0).unwrap();
        let stamp = model.render_at(50.0, 50.0, &Jacobian::scale(0.263)).unwrap();

        assert_eq!(stamp.image.dim(), (PSF_STAMP_SIZE, PSF_STAMP_SIZE));
        assert_relative_eq!(stamp.image.sum(), 1.0, epsilon = 1e-12);
        assert_eq!(stamp.center(), (10.0, 10.0));

        let expected_noise = (stamp.image.mapv(|v| v * v).sum()).sqrt() / TARGET_PSF_S2N;
        assert_relative_eq!(stamp.noise, expected_noise, epsilon = 1e-15);
        assert_relative_eq!(
            stamp.weight()[[3, 4]],
            1.0 / (stamp.noise * stamp.noise),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_gauss_model_is_position_independent() {
        let model = PsfModel::new(PsfType::Gauss, &PsfConfig::default(), 0).unwrap();
        assert_eq!(
            model.profile_at(0.0, 0.0).unwrap(),
            model.profile_at(200.0, 13.0).unwrap()
        );
    }

    #[test]
    fn test_power_spectrum_stamp() {
        let config = PsfConfig {
            n_coadd_psf: 2,
            ..Default::default()
        };
        let model = PsfModel::new(PsfType::PowerSpectrum, &config, 10).unwrap();
        assert_eq!(model.psf_type(), PsfType::PowerSpectrum);

        let jac = Jacobian::scale(config.pixel_scale);
        let stamp = model.render_at(112.0, 112.0, &jac).unwrap();
        assert_relative_eq!(stamp.image.sum(), 1.0, epsilon = 1e-12);
        assert!(stamp.image.iter().all(|&v| v > 0.0));

        let peak = stamp.image.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(stamp.image[[10, 10]], peak);
        assert_relative_eq!(stamp.profile.flux(), 2.0, epsilon = 0.1);
    }
}
