//! Numerical constants used throughout the library.

/// Tolerance for detecting near-zero values in division and step-size checks.
pub const NEAR_ZERO: f64 = 1e-15;

/// Default confidence-interval percentage for uncertainty ensembles.
pub const DEFAULT_CI_PERCENTAGE: f64 = 95.0;

/// Default reference impedance in ohms.
pub const DEFAULT_IMPEDANCE: f64 = 50.0;

/// Smallest ensemble size for which statistics are computed.
///
/// Ensembles with this many members or fewer are skipped: percentile
/// envelopes over one or two samples carry no information, and the
/// interoperating calibration tool applies the same cutoff.
pub const MIN_STATISTICS_SAMPLES: usize = 2;
