//! Spatially varying PSF simulation for weak-lensing image sims
//!
//! This crate provides a power-spectrum PSF model: a Gaussian random shear
//! and convergence field drawn from an atmospheric turbulence spectrum,
//! combined with a random quadratic size surface, evaluated as a lensed
//! Moffat profile at any image position. Several independent realizations
//! can be summed to mimic the PSF of a coadded image.

pub mod algo;
pub mod image_proc;
pub mod psf;
pub mod shared_args;

// Re-exports for easier access
pub use algo::lensing_field::{LensingField, LensingSample};
pub use algo::power_spectrum::{PowerSpectrum, TurbulenceSpectrum};
pub use image_proc::jacobian::Jacobian;
pub use image_proc::profile::Profile;
pub use psf::{PsfConfig, PsfError, PsfImage, PsfModel, PsfRealization, PsfType, StackedPsf};
