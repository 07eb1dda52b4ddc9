//! Coadd of several independent PSF realizations.
//!
//! The realizations are built on the first query from a `StdRng` seeded with
//! the stack seed and then reused, so the PSF pattern stays fixed across the
//! image for the lifetime of the stack.

use log::info;
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{PsfConfig, PsfError, PsfRealization};
use crate::image_proc::profile::Profile;

#[derive(Debug)]
pub struct StackedPsf {
    config: PsfConfig,
    seed: u64,
    realizations: OnceCell<Vec<PsfRealization>>,
}

impl StackedPsf {
    pub fn new(config: PsfConfig, seed: u64) -> Result<Self, PsfError> {
        config.validate()?;
        Ok(Self {
            config,
            seed,
            realizations: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &PsfConfig {
        &self.config
    }

    pub fn n_realizations(&self) -> usize {
        self.config.n_coadd_psf
    }

    /// The member realizations, built on first call.
    pub fn realizations(&self) -> Result<&[PsfRealization], PsfError> {
        let members = self.realizations.get_or_try_init(|| {
            info!(
                "Drawing {} PSF realization(s) with stack seed {}",
                self.config.n_coadd_psf, self.seed
            );
            let mut rng = StdRng::seed_from_u64(self.seed);
            (0..self.config.n_coadd_psf)
                .map(|_| PsfRealization::new(&self.config, &mut rng))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(members.as_slice())
    }

    /// Sum of every member's profile at pixel `(x, y)`.
    pub fn stacked_profile_at(&self, x: f64, y: f64) -> Result<Profile, PsfError> {
        let members = self
            .realizations()?
            .iter()
            .map(|realization| realization.profile_at(x, y))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Profile::sum(members))
    }
}
