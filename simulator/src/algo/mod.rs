//! Numerical building blocks for random lensing fields
//!
//! This module provides power spectra, Gaussian random field generation on a
//! periodic grid, and interpolation of gridded fields at arbitrary positions.

pub mod grid_interp;
pub mod lensing_field;
pub mod power_spectrum;

pub use grid_interp::{BoundaryPolicy, GridInterpolator, GridSpec, Interpolant, InterpolationError};
pub use lensing_field::{magnification, FieldError, LensingField, LensingSample};
pub use power_spectrum::{PowerSpectrum, TurbulenceSpectrum};
