//! Core matrix container and port-pair key model

use std::collections::BTreeMap;

use ndarray::{Array3, ArrayView1};
use num_complex::Complex64;
use thiserror::Error;

use super::series::ParameterSeries;
use crate::header::Header;

/// Matrix and series errors
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("port {0} is not present in the matrix")]
    Port(u32),

    #[error("no entry for wave {wave:?} port pair {pair}")]
    Entry { wave: Wave, pair: u32 },

    #[error("series share no overlapping frequencies")]
    NoOverlap,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// A named measured quantity per port pair.
///
/// `S` is a scattering parameter; `A`/`B` are incident/reflected wave
/// parameters; `T` is a pseudo-wave parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Wave {
    S,
    A,
    B,
    T,
}

impl Wave {
    pub fn label(&self) -> &'static str {
        match self {
            Wave::S => "S",
            Wave::A => "A",
            Wave::B => "B",
            Wave::T => "T",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "S" => Some(Wave::S),
            "A" => Some(Wave::A),
            "B" => Some(Wave::B),
            "T" => Some(Wave::T),
            _ => None,
        }
    }
}

/// Port-pair key for a (destination, source) port combination.
///
/// `pair_key(2, 1) == 21`: response at port 2 for a stimulus at port 1.
pub fn pair_key(dst: u32, src: u32) -> u32 {
    dst * 10 + src
}

/// Decompose a port-pair key into (destination, source) ports.
pub fn pair_ports(key: u32) -> (u32, u32) {
    (key / 10, key % 10)
}

/// Enumeration order of port-pair keys.
///
/// Selected once per matrix shape, never re-derived ad hoc. Two-port
/// S-parameter files carry the externally mandated order
/// `(11, 21, 12, 22)`; every other shape enumerates row-major over
/// sorted ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKeyStrategy {
    TwoPortLegacy,
    Generic,
}

impl PortKeyStrategy {
    /// Pick the strategy for a port set and wave set.
    pub fn select(num_ports: usize, waves: &[Wave]) -> Self {
        if num_ports == 2 && matches!(waves, [Wave::S]) {
            PortKeyStrategy::TwoPortLegacy
        } else {
            PortKeyStrategy::Generic
        }
    }

    /// Enumerate port-pair keys for sorted `ports`.
    pub fn enumerate(&self, ports: &[u32]) -> Vec<u32> {
        match self {
            PortKeyStrategy::TwoPortLegacy => {
                let (a, b) = (ports[0], ports[1]);
                vec![
                    pair_key(a, a),
                    pair_key(b, a),
                    pair_key(a, b),
                    pair_key(b, b),
                ]
            }
            PortKeyStrategy::Generic => {
                let mut keys = Vec::with_capacity(ports.len() * ports.len());
                for &i in ports {
                    for &j in ports {
                        keys.push(pair_key(i, j));
                    }
                }
                keys
            }
        }
    }
}

/// The in-memory table of a multi-port, multi-frequency measurement:
/// ports x waves x frequency -> complex value.
///
/// Every (wave, port-pair) column shares the same frequency axis.
/// Frequency values are kept in the base unit (Hz for frequency axes)
/// and rounded to the nearest whole Hz so that repeated round trips
/// through text files cannot drift.
#[derive(Debug, Clone)]
pub struct NetworkParameterMatrix {
    ports: Vec<u32>,
    waves: Vec<Wave>,
    pairs: Vec<u32>,
    strategy: PortKeyStrategy,
    frequencies: Vec<f64>,
    /// Values indexed `[wave][pair][frequency]`.
    values: Array3<Complex64>,
    pub header: Header,
    pub comments: Vec<String>,
    pub name: Option<String>,
}

impl NetworkParameterMatrix {
    /// Create an empty (NaN-filled) matrix over explicit ports.
    pub fn empty(ports: Vec<u32>, waves: Vec<Wave>, frequencies: Vec<f64>, header: Header) -> Self {
        let mut ports = ports;
        ports.sort_unstable();
        ports.dedup();

        let frequencies = round_axis(frequencies, &header);
        let strategy = PortKeyStrategy::select(ports.len(), &waves);
        let pairs = strategy.enumerate(&ports);
        let values = Array3::from_elem(
            (waves.len(), pairs.len(), frequencies.len()),
            Complex64::new(f64::NAN, f64::NAN),
        );

        Self {
            ports,
            waves,
            pairs,
            strategy,
            frequencies,
            values,
            header,
            comments: Vec::new(),
            name: None,
        }
    }

    /// Create an empty matrix over ports `1..=num_ports`.
    pub fn with_port_count(
        num_ports: usize,
        waves: Vec<Wave>,
        frequencies: Vec<f64>,
        header: Header,
    ) -> Self {
        let ports = (1..=num_ports as u32).collect();
        Self::empty(ports, waves, frequencies, header)
    }

    #[inline]
    pub fn ports(&self) -> &[u32] {
        &self.ports
    }

    #[inline]
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Port-pair keys in enumeration order.
    #[inline]
    pub fn pairs(&self) -> &[u32] {
        &self.pairs
    }

    #[inline]
    pub fn strategy(&self) -> PortKeyStrategy {
        self.strategy
    }

    /// Axis values in the base unit (Hz, seconds, or radians).
    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    #[inline]
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Number of axis points.
    #[inline]
    pub fn npoints(&self) -> usize {
        self.frequencies.len()
    }

    pub fn wave_index(&self, wave: Wave) -> Option<usize> {
        self.waves.iter().position(|&w| w == wave)
    }

    pub fn pair_index(&self, pair: u32) -> Option<usize> {
        self.pairs.iter().position(|&p| p == pair)
    }

    /// Borrow one (wave, port-pair) column.
    pub fn column(&self, wave: Wave, pair: u32) -> Option<ArrayView1<'_, Complex64>> {
        let wi = self.wave_index(wave)?;
        let pi = self.pair_index(pair)?;
        Some(self.values.slice(ndarray::s![wi, pi, ..]))
    }

    /// Extract one (wave, port-pair) column as an owned series aligned
    /// to this matrix's axis.
    pub fn series(&self, wave: Wave, pair: u32) -> Option<ParameterSeries> {
        let col = self.column(wave, pair)?;
        Some(ParameterSeries::new(
            self.frequencies.clone(),
            col.to_vec(),
        ))
    }

    /// Overwrite one (wave, port-pair) column.
    pub fn set_column(
        &mut self,
        wave: Wave,
        pair: u32,
        values: &[Complex64],
    ) -> Result<(), MatrixError> {
        let wi = self
            .wave_index(wave)
            .ok_or(MatrixError::Entry { wave, pair })?;
        let pi = self
            .pair_index(pair)
            .ok_or(MatrixError::Entry { wave, pair })?;
        if values.len() != self.frequencies.len() {
            return Err(MatrixError::ShapeMismatch(format!(
                "column has {} points, axis has {}",
                values.len(),
                self.frequencies.len()
            )));
        }
        for (k, &v) in values.iter().enumerate() {
            self.values[[wi, pi, k]] = v;
        }
        Ok(())
    }

    /// |value| for every entry, recomputed on access.
    pub fn magnitude(&self) -> Array3<f64> {
        self.values.mapv(|c| c.norm())
    }

    /// 20*log10(|value|) for every entry.
    pub fn magnitude_db(&self) -> Array3<f64> {
        self.values.mapv(|c| 20.0 * c.norm().log10())
    }

    /// arg(value) in radians for every entry.
    pub fn phase_rad(&self) -> Array3<f64> {
        self.values.mapv(|c| c.arg())
    }

    /// arg(value) in degrees for every entry.
    pub fn phase_deg(&self) -> Array3<f64> {
        self.values.mapv(|c| c.arg() * 180.0 / std::f64::consts::PI)
    }

    /// Collect all columns keyed by (wave, pair), preserving values.
    pub(crate) fn to_columns(&self) -> BTreeMap<(Wave, u32), Vec<Complex64>> {
        let mut map = BTreeMap::new();
        for (wi, &w) in self.waves.iter().enumerate() {
            for (pi, &p) in self.pairs.iter().enumerate() {
                let col: Vec<Complex64> = (0..self.frequencies.len())
                    .map(|k| self.values[[wi, pi, k]])
                    .collect();
                map.insert((w, p), col);
            }
        }
        map
    }

    /// Rebuild a matrix over a new port set from a column map. Pairs
    /// missing from the map stay NaN; pairs in the map that the new
    /// enumeration does not track are dropped.
    pub(crate) fn from_columns(
        ports: Vec<u32>,
        waves: Vec<Wave>,
        frequencies: Vec<f64>,
        header: Header,
        columns: &BTreeMap<(Wave, u32), Vec<Complex64>>,
    ) -> Self {
        let mut m = Self::empty(ports, waves, frequencies, header);
        for (wi, &w) in m.waves.clone().iter().enumerate() {
            for (pi, &p) in m.pairs.clone().iter().enumerate() {
                if let Some(col) = columns.get(&(w, p)) {
                    for (k, &v) in col.iter().enumerate() {
                        m.values[[wi, pi, k]] = v;
                    }
                }
            }
        }
        m
    }

    /// Replace the port set in place, carrying columns over by key.
    pub(crate) fn rebuild_ports(
        &mut self,
        ports: Vec<u32>,
        columns: &BTreeMap<(Wave, u32), Vec<Complex64>>,
    ) {
        let mut rebuilt = Self::from_columns(
            ports,
            self.waves.clone(),
            self.frequencies.clone(),
            self.header,
            columns,
        );
        rebuilt.comments = std::mem::take(&mut self.comments);
        rebuilt.name = self.name.take();
        *self = rebuilt;
    }
}

/// Round frequency-class axes to the nearest whole Hz. Time and angle
/// axes pass through unchanged.
fn round_axis(frequencies: Vec<f64>, header: &Header) -> Vec<f64> {
    if header.unit.is_frequency() {
        frequencies.into_iter().map(f64::round).collect()
    } else {
        frequencies
    }
}

/// Equality over shape and values; NaN entries compare equal to NaN so
/// that never-populated columns do not poison comparisons.
impl PartialEq for NetworkParameterMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.ports == other.ports
            && self.waves == other.waves
            && self.pairs == other.pairs
            && self.frequencies == other.frequencies
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| complex_eq_nan(*a, *b))
    }
}

fn complex_eq_nan(a: Complex64, b: Complex64) -> bool {
    let part = |x: f64, y: f64| x == y || (x.is_nan() && y.is_nan());
    part(a.re, b.re) && part(a.im, b.im)
}
