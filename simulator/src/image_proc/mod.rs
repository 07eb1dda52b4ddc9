//! Analytic surface-brightness profiles and their rasterization.
//!
//! Profiles live in world coordinates (arcsec); a [`Jacobian`] maps stamp
//! pixels onto them when drawing.

pub mod jacobian;
pub mod profile;

pub use jacobian::Jacobian;
pub use profile::{Gaussian, Moffat, Profile, ProfileError};
