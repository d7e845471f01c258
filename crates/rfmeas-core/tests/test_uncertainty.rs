//! Ensemble statistics over real files

use approx::assert_relative_eq;
use num_complex::Complex64;
use rfmeas_core::codec::{self, CodecOptions, Format};
use rfmeas_core::header::Header;
use rfmeas_core::matrix::{NetworkParameterMatrix, Wave};
use rfmeas_core::measurement::{EnsembleKind, EnsembleState, Realization, UncertaintyEnsemble};
use tempfile::tempdir;

fn write_one_port(dir: &std::path::Path, name: &str, mag: f64) -> std::path::PathBuf {
    let mut m = NetworkParameterMatrix::with_port_count(
        1,
        vec![Wave::S],
        vec![1e9],
        Header::default(),
    );
    m.set_column(Wave::S, 11, &[Complex64::new(mag, 0.0)])
        .unwrap();
    codec::write(&m, dir.join(name), Format::Text, false).unwrap()
}

#[test]
fn test_monte_carlo_statistics_from_files() {
    let dir = tempdir().unwrap();
    let mut ensemble = UncertaintyEnsemble::new(EnsembleKind::MonteCarlo);
    for k in 1..=5 {
        let name = format!("mc_{k}.s1p");
        write_one_port(dir.path(), &name, k as f64);
        // Relative paths resolve against the working directory.
        ensemble.add_item(Realization::new(format!("mc_{k}"), name));
    }
    assert_eq!(ensemble.state(), EnsembleState::Populated);

    ensemble
        .calculate_statistics(Some(dir.path()), &CodecOptions::default())
        .unwrap();
    assert_eq!(ensemble.state(), EnsembleState::Reduced);

    // Magnitudes [1..5] at 95%: lower bound 2, upper bound 4.
    let ci = ensemble.confidence_interval().unwrap();
    assert_relative_eq!(
        ci.lower.series(Wave::S, 11).unwrap().magnitude()[0],
        2.0,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        ci.upper.series(Wave::S, 11).unwrap().magnitude()[0],
        4.0,
        epsilon = 1e-12
    );

    let estimate = ensemble.estimate().unwrap();
    assert_relative_eq!(
        estimate.series(Wave::S, 11).unwrap().magnitude()[0],
        3.0,
        epsilon = 1e-12
    );

    let band = ensemble.standard_uncertainty().unwrap();
    let std = 2.0f64.sqrt(); // population std of [1,2,3,4,5]
    assert_relative_eq!(
        band.upper.series(Wave::S, 11).unwrap().magnitude()[0],
        3.0 + std,
        epsilon = 1e-12
    );
    assert_relative_eq!(
        band.lower.series(Wave::S, 11).unwrap().magnitude()[0],
        3.0 - std,
        epsilon = 1e-12
    );

    // Statistics results are ordinary matrices: the codec applies.
    let out = codec::write(
        estimate,
        dir.path().join("estimate.s1p"),
        Format::Binary,
        true,
    )
    .unwrap();
    let back = codec::read(&out, &CodecOptions::default()).unwrap();
    assert_eq!(&back, estimate);
}

#[test]
fn test_missing_member_aborts_load() {
    let dir = tempdir().unwrap();
    write_one_port(dir.path(), "ok.s1p", 1.0);

    let mut ensemble = UncertaintyEnsemble::new(EnsembleKind::Perturbed);
    ensemble.add_item(Realization::new("ok", "ok.s1p"));
    ensemble.add_item(Realization::new("gone", "gone.s1p"));
    ensemble.add_item(Realization::new("ok2", "ok.s1p"));

    let err = ensemble.load_data(Some(dir.path()), &CodecOptions::default());
    assert!(err.is_err());
    assert_ne!(ensemble.state(), EnsembleState::Loaded);
}
