//! Ensemble reductions
//!
//! Turns the loaded matrices of an uncertainty ensemble into an
//! aggregate estimate, a percentile confidence envelope, and a
//! standard-uncertainty band. All three work in magnitude/phase space,
//! with phase unwrapped along the frequency axis per realization, to
//! match the interoperating calibration tool. Each reduction returns
//! full matrices of the members' shape, so codec and port algebra apply
//! to statistical results unchanged.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::matrix::{MatrixError, NetworkParameterMatrix, Wave};

/// Mean magnitude and mean unwrapped phase across realizations,
/// recombined to complex.
pub fn estimate(members: &[&NetworkParameterMatrix]) -> Result<NetworkParameterMatrix, MatrixError> {
    let shape = ensure_same_shape(members)?;
    let n = members.len() as f64;

    let mut out = clone_shape(&shape);
    for &w in shape.waves() {
        for &p in shape.pairs() {
            let (mags, phases) = polar_columns(members, w, p)?;
            let column: Vec<Complex64> = (0..shape.npoints())
                .map(|k| {
                    let mag = mags.iter().map(|v| v[k]).sum::<f64>() / n;
                    let phase = phases.iter().map(|v| v[k]).sum::<f64>() / n;
                    Complex64::from_polar(mag, phase)
                })
                .collect();
            out.set_column(w, p, &column)?;
        }
    }
    Ok(out)
}

/// Percentile confidence envelope.
///
/// Per (wave, port-pair, frequency), magnitudes and phases are sorted
/// independently across the realization axis and the bounds recombined
/// from the sorted sequences at the percentile indices; complex tuples
/// are never sorted jointly. Returns `(upper, lower)`.
pub fn confidence_interval(
    members: &[&NetworkParameterMatrix],
    percentage: f64,
) -> Result<(NetworkParameterMatrix, NetworkParameterMatrix), MatrixError> {
    let shape = ensure_same_shape(members)?;
    let (lo, hi) = ci_indices(members.len(), percentage);

    let out = reduce2(members, &shape, |mut mags, mut phases| {
        mags.sort_by(f64::total_cmp);
        phases.sort_by(f64::total_cmp);
        let upper = Complex64::from_polar(mags[hi - 1], phases[hi - 1]);
        let lower = Complex64::from_polar(mags[lo], phases[lo]);
        (upper, lower)
    })?;
    Ok(out)
}

/// Mean plus/minus one standard deviation of magnitude and phase,
/// recombined. Returns `(upper, lower)`.
pub fn standard_uncertainty(
    members: &[&NetworkParameterMatrix],
) -> Result<(NetworkParameterMatrix, NetworkParameterMatrix), MatrixError> {
    let shape = ensure_same_shape(members)?;

    reduce2(members, &shape, |mags, phases| {
        let (mag_mean, mag_std) = mean_std(&mags);
        let (ph_mean, ph_std) = mean_std(&phases);
        let upper = Complex64::from_polar(mag_mean + mag_std, ph_mean + ph_std);
        let lower = Complex64::from_polar(mag_mean - mag_std, ph_mean - ph_std);
        (upper, lower)
    })
}

/// Percentile indices for an ensemble of `n` realizations.
///
/// `lo = max(1, floor(0.5 * (1 - p/100) * n))` and `hi = n - lo`, so
/// `lo + hi == n` and `lo >= 1` always hold. The lower bound reads the
/// sorted sequence at `lo`, the upper bound at `hi - 1`.
pub fn ci_indices(n: usize, percentage: f64) -> (usize, usize) {
    let tail = 0.5 * (1.0 - percentage / 100.0) * n as f64;
    let lo = (tail.floor() as usize).max(1);
    (lo, n - lo)
}

/// Unwrap a phase sequence in place: successive differences are folded
/// into (-pi, pi].
pub(crate) fn unwrap_phase(phases: &mut [f64]) {
    let two_pi = 2.0 * PI;
    let mut correction = 0.0;
    for k in 1..phases.len() {
        let raw = phases[k];
        let mut delta = raw + correction - phases[k - 1];
        while delta > PI {
            correction -= two_pi;
            delta -= two_pi;
        }
        while delta < -PI {
            correction += two_pi;
            delta += two_pi;
        }
        phases[k] = raw + correction;
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Check all members share ports, waves, pairs, and axis; returns a
/// clone of the first member to serve as the output template.
fn ensure_same_shape(
    members: &[&NetworkParameterMatrix],
) -> Result<NetworkParameterMatrix, MatrixError> {
    let first = members
        .first()
        .ok_or_else(|| MatrixError::ShapeMismatch("empty ensemble".into()))?;
    for m in &members[1..] {
        if m.ports() != first.ports()
            || m.waves() != first.waves()
            || m.frequencies() != first.frequencies()
        {
            return Err(MatrixError::ShapeMismatch(
                "ensemble members differ in shape".into(),
            ));
        }
    }
    Ok(clone_shape(first))
}

fn clone_shape(template: &NetworkParameterMatrix) -> NetworkParameterMatrix {
    NetworkParameterMatrix::empty(
        template.ports().to_vec(),
        template.waves().to_vec(),
        template.frequencies().to_vec(),
        template.header,
    )
}

/// Magnitude and unwrapped-phase columns of every member for one key:
/// `(mags[member][freq], phases[member][freq])`.
fn polar_columns(
    members: &[&NetworkParameterMatrix],
    wave: Wave,
    pair: u32,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), MatrixError> {
    let mut mags = Vec::with_capacity(members.len());
    let mut phases = Vec::with_capacity(members.len());
    for m in members {
        let col = m
            .column(wave, pair)
            .ok_or(MatrixError::Entry { wave, pair })?;
        mags.push(col.iter().map(|c| c.norm()).collect::<Vec<f64>>());
        let mut ph: Vec<f64> = col.iter().map(|c| c.arg()).collect();
        unwrap_phase(&mut ph);
        phases.push(ph);
    }
    Ok((mags, phases))
}

/// Two-output reduction (upper, lower) over the realization axis. The
/// closure sees the per-member magnitude and phase samples of a single
/// (wave, pair, frequency) cell.
fn reduce2(
    members: &[&NetworkParameterMatrix],
    shape: &NetworkParameterMatrix,
    mut cell: impl FnMut(Vec<f64>, Vec<f64>) -> (Complex64, Complex64),
) -> Result<(NetworkParameterMatrix, NetworkParameterMatrix), MatrixError> {
    let mut upper = clone_shape(shape);
    let mut lower = clone_shape(shape);
    for &w in shape.waves() {
        for &p in shape.pairs() {
            let (mags, phases) = polar_columns(members, w, p)?;
            let mut up_col = Vec::with_capacity(shape.npoints());
            let mut lo_col = Vec::with_capacity(shape.npoints());
            for k in 0..shape.npoints() {
                let m: Vec<f64> = mags.iter().map(|v| v[k]).collect();
                let ph: Vec<f64> = phases.iter().map(|v| v[k]).collect();
                let (u, l) = cell(m, ph);
                up_col.push(u);
                lo_col.push(l);
            }
            upper.set_column(w, p, &up_col)?;
            lower.set_column(w, p, &lo_col)?;
        }
    }
    Ok((upper, lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use approx::assert_relative_eq;

    fn one_port(mag: f64, phase: f64, freqs: &[f64]) -> NetworkParameterMatrix {
        let mut m = NetworkParameterMatrix::with_port_count(
            1,
            vec![Wave::S],
            freqs.to_vec(),
            Header::default(),
        );
        let col: Vec<Complex64> = freqs
            .iter()
            .map(|_| Complex64::from_polar(mag, phase))
            .collect();
        m.set_column(Wave::S, 11, &col).unwrap();
        m
    }

    #[test]
    fn test_ci_indices() {
        assert_eq!(ci_indices(5, 95.0), (1, 4));
        assert_eq!(ci_indices(100, 95.0), (2, 98));
        assert_eq!(ci_indices(3, 50.0), (1, 2));
        // lo >= 1 and lo + hi == n for a range of shapes
        for n in 3..40 {
            for p in [50.0, 90.0, 95.0, 99.0] {
                let (lo, hi) = ci_indices(n, p);
                assert!(lo >= 1);
                assert_eq!(lo + hi, n);
            }
        }
    }

    #[test]
    fn test_confidence_interval_concrete_scenario() {
        let freqs = [1e9];
        let members: Vec<NetworkParameterMatrix> = (1..=5)
            .map(|k| one_port(k as f64, 0.0, &freqs))
            .collect();
        let refs: Vec<&NetworkParameterMatrix> = members.iter().collect();

        let (upper, lower) = confidence_interval(&refs, 95.0).unwrap();
        let up = upper.series(Wave::S, 11).unwrap();
        let lo = lower.series(Wave::S, 11).unwrap();
        assert_relative_eq!(up.values()[0].re, 4.0, epsilon = 1e-12);
        assert_relative_eq!(lo.values()[0].re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_averages_in_polar_space() {
        let freqs = [1e9, 2e9];
        let members = [
            one_port(1.0, 0.2, &freqs),
            one_port(3.0, 0.4, &freqs),
            one_port(5.0, 0.6, &freqs),
        ];
        let refs: Vec<&NetworkParameterMatrix> = members.iter().collect();

        let est = estimate(&refs).unwrap();
        let s = est.series(Wave::S, 11).unwrap();
        assert_relative_eq!(s.magnitude()[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.phase_rad()[1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_standard_uncertainty_band() {
        let freqs = [1e9];
        let members = [
            one_port(1.0, 0.0, &freqs),
            one_port(2.0, 0.0, &freqs),
            one_port(3.0, 0.0, &freqs),
        ];
        let refs: Vec<&NetworkParameterMatrix> = members.iter().collect();

        let (upper, lower) = standard_uncertainty(&refs).unwrap();
        let std = (2.0f64 / 3.0).sqrt(); // population std of [1,2,3]
        assert_relative_eq!(
            upper.series(Wave::S, 11).unwrap().magnitude()[0],
            2.0 + std,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            lower.series(Wave::S, 11).unwrap().magnitude()[0],
            2.0 - std,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_unwrap_phase() {
        let mut p = vec![3.0, -3.0, 3.0];
        unwrap_phase(&mut p);
        assert_relative_eq!(p[1], -3.0 + 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(p[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let a = one_port(1.0, 0.0, &[1e9]);
        let b = one_port(1.0, 0.0, &[2e9]);
        assert!(estimate(&[&a, &b]).is_err());
        assert!(estimate(&[]).is_err());
    }
}
