//! Analytic surface-brightness profiles for PSFs.
//!
//! A [`Profile`] is either a single radial component ([`Moffat`] or [`Gaussian`])
//! placed in world coordinates by a linear transform, an offset and a flux, or a
//! [`Profile::Sum`] of other profiles. Every variant supports the same set of
//! operations: shear, magnify, lens, shift, flux scaling, surface-brightness
//! evaluation and rasterization through a local [`Jacobian`].
//!
//! Transforms follow the gravitational-lensing convention: a reduced shear
//! `(g1, g2)` applies the area-preserving matrix
//!
//! ```text
//! S = 1/sqrt(1 - g²) * [[1 + g1, g2], [g2, 1 - g1]]
//! ```
//!
//! and a magnification `mu` scales linear size by `sqrt(mu)` and flux by `mu`,
//! leaving surface brightness unchanged.

use nalgebra::{Matrix2, Vector2};
use ndarray::Array2;
use std::f64::consts::{LN_2, PI};
use thiserror::Error;

use super::jacobian::Jacobian;

/// Subpixel samples per axis used by [`Profile::draw_image`].
pub const DEFAULT_OVERSAMPLING: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("FWHM must be positive and finite, got {0}")]
    InvalidFwhm(f64),
    #[error("Moffat beta must be greater than 1, got {0}")]
    InvalidBeta(f64),
    #[error("shear magnitude must be below 1, got g1 = {g1}, g2 = {g2}")]
    InvalidShear { g1: f64, g2: f64 },
    #[error("magnification must be positive and finite, got {0}")]
    InvalidMagnification(f64),
}

fn check_fwhm(fwhm: f64) -> Result<(), ProfileError> {
    if fwhm.is_finite() && fwhm > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::InvalidFwhm(fwhm))
    }
}

/// Moffat profile `I(r) ∝ (1 + (r / r_d)²)^(-beta)`, normalized to unit flux.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moffat {
    beta: f64,
    scale_radius: f64,
}

impl Moffat {
    /// Moffat with power-law index `beta` and the given FWHM.
    pub fn from_fwhm(beta: f64, fwhm: f64) -> Result<Self, ProfileError> {
        if !(beta.is_finite() && beta > 1.0) {
            return Err(ProfileError::InvalidBeta(beta));
        }
        check_fwhm(fwhm)?;
        let scale_radius = 0.5 * fwhm / (2.0_f64.powf(1.0 / beta) - 1.0).sqrt();
        Ok(Self { beta, scale_radius })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn scale_radius(&self) -> f64 {
        self.scale_radius
    }

    pub fn fwhm(&self) -> f64 {
        2.0 * self.scale_radius * (2.0_f64.powf(1.0 / self.beta) - 1.0).sqrt()
    }

    fn unit_brightness(&self, r2: f64) -> f64 {
        let rd2 = self.scale_radius * self.scale_radius;
        (self.beta - 1.0) / (PI * rd2) * (1.0 + r2 / rd2).powf(-self.beta)
    }
}

/// Circular Gaussian, normalized to unit flux.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    sigma: f64,
}

impl Gaussian {
    pub fn from_fwhm(fwhm: f64) -> Result<Self, ProfileError> {
        check_fwhm(fwhm)?;
        Ok(Self {
            sigma: fwhm / (2.0 * (2.0 * LN_2).sqrt()),
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn fwhm(&self) -> f64 {
        2.0 * (2.0 * LN_2).sqrt() * self.sigma
    }

    fn unit_brightness(&self, r2: f64) -> f64 {
        let s2 = self.sigma * self.sigma;
        (-0.5 * r2 / s2).exp() / (2.0 * PI * s2)
    }
}

/// Flux and world placement of a radial component.
///
/// World position `w = forward * p + offset` for intrinsic position `p`;
/// `inverse` is kept in step with `forward` so evaluation never inverts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    flux: f64,
    forward: Matrix2<f64>,
    inverse: Matrix2<f64>,
    offset: Vector2<f64>,
}

impl Placement {
    fn unit(flux: f64) -> Self {
        Self {
            flux,
            forward: Matrix2::identity(),
            inverse: Matrix2::identity(),
            offset: Vector2::zeros(),
        }
    }

    fn apply(&mut self, m: &Matrix2<f64>, m_inv: &Matrix2<f64>) {
        self.forward = m * self.forward;
        self.inverse = self.inverse * m_inv;
        self.offset = m * self.offset;
    }

    pub fn flux(&self) -> f64 {
        self.flux
    }

    pub fn transform(&self) -> &Matrix2<f64> {
        &self.forward
    }

    pub fn offset(&self) -> &Vector2<f64> {
        &self.offset
    }

    /// Intrinsic squared radius of world point `(u, v)` and the area Jacobian.
    fn pullback(&self, u: f64, v: f64) -> (f64, f64) {
        let p = self.inverse * (Vector2::new(u, v) - self.offset);
        (p.norm_squared(), self.inverse.determinant().abs())
    }
}

/// Surface-brightness profile in world coordinates (arcsec).
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Moffat(Moffat, Placement),
    Gaussian(Gaussian, Placement),
    /// Unweighted sum of member profiles
    Sum(Vec<Profile>),
}

impl Profile {
    /// Centred, round Moffat profile.
    pub fn moffat(beta: f64, fwhm: f64, flux: f64) -> Result<Self, ProfileError> {
        Ok(Profile::Moffat(
            Moffat::from_fwhm(beta, fwhm)?,
            Placement::unit(flux),
        ))
    }

    /// Centred, round Gaussian profile.
    pub fn gaussian(fwhm: f64, flux: f64) -> Result<Self, ProfileError> {
        Ok(Profile::Gaussian(
            Gaussian::from_fwhm(fwhm)?,
            Placement::unit(flux),
        ))
    }

    pub fn sum(members: Vec<Profile>) -> Self {
        Profile::Sum(members)
    }

    fn for_each_placement(&mut self, f: &mut impl FnMut(&mut Placement)) {
        match self {
            Profile::Moffat(_, placement) | Profile::Gaussian(_, placement) => f(placement),
            Profile::Sum(members) => {
                for member in members {
                    member.for_each_placement(f);
                }
            }
        }
    }

    fn linear_transform(mut self, m: Matrix2<f64>, m_inv: Matrix2<f64>) -> Self {
        self.for_each_placement(&mut |placement| placement.apply(&m, &m_inv));
        self
    }

    /// Apply an area-preserving reduced shear.
    pub fn shear(self, g1: f64, g2: f64) -> Result<Self, ProfileError> {
        let g_sq = g1 * g1 + g2 * g2;
        if !(g_sq < 1.0) {
            return Err(ProfileError::InvalidShear { g1, g2 });
        }
        let norm = 1.0 / (1.0 - g_sq).sqrt();
        let m = Matrix2::new(1.0 + g1, g2, g2, 1.0 - g1) * norm;
        let m_inv = Matrix2::new(1.0 - g1, -g2, -g2, 1.0 + g1) * norm;
        Ok(self.linear_transform(m, m_inv))
    }

    /// Scale size by `sqrt(mu)` and flux by `mu`.
    pub fn magnify(self, mu: f64) -> Result<Self, ProfileError> {
        if !(mu.is_finite() && mu > 0.0) {
            return Err(ProfileError::InvalidMagnification(mu));
        }
        let scale = mu.sqrt();
        let mut out = self.linear_transform(
            Matrix2::identity() * scale,
            Matrix2::identity() / scale,
        );
        out.for_each_placement(&mut |placement| placement.flux *= mu);
        Ok(out)
    }

    /// Shear by `(g1, g2)`, then magnify by `mu`.
    pub fn lens(self, g1: f64, g2: f64, mu: f64) -> Result<Self, ProfileError> {
        self.shear(g1, g2)?.magnify(mu)
    }

    /// Translate by `(du, dv)` arcsec.
    pub fn shift(mut self, du: f64, dv: f64) -> Self {
        let delta = Vector2::new(du, dv);
        self.for_each_placement(&mut |placement| placement.offset += delta);
        self
    }

    pub fn scale_flux(mut self, factor: f64) -> Self {
        self.for_each_placement(&mut |placement| placement.flux *= factor);
        self
    }

    pub fn flux(&self) -> f64 {
        match self {
            Profile::Moffat(_, placement) | Profile::Gaussian(_, placement) => placement.flux,
            Profile::Sum(members) => members.iter().map(Profile::flux).sum(),
        }
    }

    /// Surface brightness (flux per square arcsec) at world position `(u, v)`.
    pub fn surface_brightness(&self, u: f64, v: f64) -> f64 {
        match self {
            Profile::Moffat(shape, placement) => {
                let (r2, area) = placement.pullback(u, v);
                placement.flux * area * shape.unit_brightness(r2)
            }
            Profile::Gaussian(shape, placement) => {
                let (r2, area) = placement.pullback(u, v);
                placement.flux * area * shape.unit_brightness(r2)
            }
            Profile::Sum(members) => members
                .iter()
                .map(|member| member.surface_brightness(u, v))
                .sum(),
        }
    }

    /// Rasterize onto an `nx` by `ny` stamp centred on the stamp's true centre.
    ///
    /// Each pixel holds the flux falling inside it, integrated over
    /// [`DEFAULT_OVERSAMPLING`]² subpixel samples.
    pub fn draw_image(&self, nx: usize, ny: usize, jacobian: &Jacobian) -> Array2<f64> {
        self.draw_image_with_oversampling(nx, ny, jacobian, DEFAULT_OVERSAMPLING)
    }

    pub fn draw_image_with_oversampling(
        &self,
        nx: usize,
        ny: usize,
        jacobian: &Jacobian,
        oversampling: usize,
    ) -> Array2<f64> {
        let n_sub = oversampling.max(1);
        let step = 1.0 / n_sub as f64;
        let cx = (nx as f64 - 1.0) / 2.0;
        let cy = (ny as f64 - 1.0) / 2.0;
        let weight = jacobian.pixel_area() * step * step;

        Array2::from_shape_fn((ny, nx), |(row, col)| {
            let mut total = 0.0;
            for sy in 0..n_sub {
                let dy = row as f64 - cy - 0.5 + (sy as f64 + 0.5) * step;
                for sx in 0..n_sub {
                    let dx = col as f64 - cx - 0.5 + (sx as f64 + 0.5) * step;
                    let w = jacobian.to_world(dx, dy);
                    total += self.surface_brightness(w.x, w.y);
                }
            }
            total * weight
        })
    }
}
