//! Spatially varying PSF models.
//!
//! The power-spectrum PSF combines a random lensing field (shape and
//! magnification variation) with a random quadratic FWHM surface (size
//! variation), and sums several independent realizations to mimic a coadd.

pub mod config;
pub mod model;
pub mod power_spectrum_psf;
pub mod size_model;
pub mod stack;

pub use config::PsfConfig;
pub use model::{PsfImage, PsfModel, PsfType};
pub use power_spectrum_psf::PsfRealization;
pub use size_model::SizeModel;
pub use stack::StackedPsf;

use thiserror::Error;

use crate::algo::lensing_field::FieldError;
use crate::image_proc::profile::ProfileError;

/// Errors raised while configuring or evaluating a PSF model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PsfError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("PSF FWHM {fwhm} at ({x}, {y}) is not positive")]
    NonPositiveFwhm { x: f64, y: f64, fwhm: f64 },
    #[error("psf_type \"{0}\" not valid")]
    UnknownPsfType(String),
    #[error("invalid PSF configuration: {0}")]
    InvalidConfig(String),
    #[error("rendered PSF stamp has non-positive total flux {0}")]
    EmptyStamp(f64),
}
