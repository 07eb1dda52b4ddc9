use clap::Parser;
use std::path::PathBuf;

use crate::algo::grid_interp::{BoundaryPolicy, Interpolant};
use crate::psf::{PsfConfig, PsfType};

/// Parse a PSF family name ("gauss" or "ps")
fn parse_psf_type(s: &str) -> Result<PsfType, String> {
    s.trim().parse::<PsfType>().map_err(|e| e.to_string())
}

/// Common PSF arguments shared across binaries
///
/// PSF parameters left unset take their value from `--config` when given,
/// otherwise from [`PsfConfig::default`].
#[derive(Parser, Debug, Clone)]
pub struct SharedPsfArgs {
    /// PSF family: "gauss" or "ps"
    #[arg(long, default_value = "ps", value_parser = parse_psf_type)]
    pub psf_type: PsfType,

    /// Random seed for the PSF realizations
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// JSON file with PSF configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Image side length in pixels [default: 225]
    #[arg(long)]
    pub image_width: Option<usize>,

    /// Pixel scale in arcsec per pixel [default: 0.263]
    #[arg(long)]
    pub pixel_scale: Option<f64>,

    /// Turbulence truncation scale in arcsec [default: 10]
    #[arg(long)]
    pub trunc: Option<f64>,

    /// Number of realizations summed into the PSF [default: 1]
    #[arg(long)]
    pub n_coadd_psf: Option<usize>,

    /// Lensing grid points per side [default: 64]
    #[arg(long)]
    pub n_grid: Option<usize>,

    /// Total shear variance of each field [default: 1e-4]
    #[arg(long)]
    pub target_variance: Option<f64>,

    /// Field interpolation scheme [default: cubic]
    #[arg(long, value_enum)]
    pub interpolant: Option<Interpolant>,

    /// Handling of positions outside the field grid [default: clamp]
    #[arg(long, value_enum)]
    pub boundary: Option<BoundaryPolicy>,
}

impl SharedPsfArgs {
    /// Build the PSF configuration: file (or defaults), then command-line overrides.
    pub fn to_config(&self) -> Result<PsfConfig, std::io::Error> {
        let mut config = match &self.config {
            Some(path) => PsfConfig::load_from_file(path)?,
            None => PsfConfig::default(),
        };

        if let Some(v) = self.image_width {
            config.image_width = v;
        }
        if let Some(v) = self.pixel_scale {
            config.pixel_scale = v;
        }
        if let Some(v) = self.trunc {
            config.trunc = v;
        }
        if let Some(v) = self.n_coadd_psf {
            config.n_coadd_psf = v;
        }
        if let Some(v) = self.n_grid {
            config.n_grid = v;
        }
        if let Some(v) = self.target_variance {
            config.target_variance = v;
        }
        if let Some(v) = self.interpolant {
            config.interpolant = v;
        }
        if let Some(v) = self.boundary {
            config.boundary = v;
        }
        Ok(config)
    }
}
