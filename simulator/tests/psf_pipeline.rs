//! End-to-end checks of the power-spectrum PSF through the public API.

use approx::assert_relative_eq;
use shearsim::algo::grid_interp::{BoundaryPolicy, GridSpec};
use shearsim::algo::lensing_field::{FieldError, LensingField};
use shearsim::algo::power_spectrum::TurbulenceSpectrum;
use shearsim::psf::{PsfConfig, PsfError, PsfModel, PsfType, StackedPsf};
use shearsim::Jacobian;

#[test]
fn test_turbulence_field_hits_target_variance() {
    let spectrum = TurbulenceSpectrum::new(5.0);
    let spec = GridSpec::new(64, 2.0).unwrap();
    let field = LensingField::build(&spectrum, spec, Some(2.5e-4), 314).unwrap();
    assert_relative_eq!(field.shear_variance(), 2.5e-4, max_relative = 1e-10);
}

#[test]
fn test_coadd_stamp_round_trip_through_model() {
    let config = PsfConfig {
        n_coadd_psf: 3,
        ..Default::default()
    };
    let model = PsfModel::new(PsfType::PowerSpectrum, &config, 2718).unwrap();
    let jacobian = Jacobian::scale(config.pixel_scale);

    for &(x, y) in &[(0.0, 0.0), (112.0, 112.0), (224.0, 40.0)] {
        let stamp = model.render_at(x, y, &jacobian).unwrap();
        assert_relative_eq!(stamp.image.sum(), 1.0, epsilon = 1e-12);
        assert!(stamp.noise > 0.0);
    }
}

#[test]
fn test_stack_is_deterministic_per_seed() {
    let config = PsfConfig {
        n_coadd_psf: 2,
        ..Default::default()
    };
    let a = StackedPsf::new(config.clone(), 99).unwrap();
    let b = StackedPsf::new(config.clone(), 99).unwrap();
    let c = StackedPsf::new(config, 100).unwrap();

    let pa = a.stacked_profile_at(30.0, 70.0).unwrap();
    assert_eq!(pa, b.stacked_profile_at(30.0, 70.0).unwrap());
    assert_ne!(pa, c.stacked_profile_at(30.0, 70.0).unwrap());
}

#[test]
fn test_reject_boundary_reports_out_of_domain() {
    let config = PsfConfig {
        boundary: BoundaryPolicy::Reject,
        ..Default::default()
    };
    let stack = StackedPsf::new(config, 4).unwrap();
    assert!(stack.stacked_profile_at(112.0, 112.0).is_ok());

    let realization = &stack.realizations().unwrap()[0];
    assert!(matches!(
        realization.lensing_at(5000.0, 112.0),
        Err(PsfError::Field(FieldError::OutOfDomain(_)))
    ));
}

#[test]
fn test_config_file_drives_model() {
    let path = std::env::temp_dir().join(format!("psf_pipeline_{}.json", std::process::id()));
    std::fs::write(&path, r#"{"image_width": 101, "trunc": 20.0, "n_coadd_psf": 2}"#).unwrap();
    let config = PsfConfig::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.image_width, 101);
    let stack = StackedPsf::new(config, 8).unwrap();
    assert_eq!(stack.realizations().unwrap().len(), 2);
    assert_relative_eq!(
        stack.stacked_profile_at(50.0, 50.0).unwrap().flux(),
        2.0,
        epsilon = 0.1
    );
}

#[test]
fn test_unknown_psf_type() {
    assert_eq!(
        "real_psf".parse::<PsfType>(),
        Err(PsfError::UnknownPsfType("real_psf".to_string()))
    );
}
