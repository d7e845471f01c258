//! Format descriptor ("header") line model
//!
//! A header is the single `#`-prefixed line of a network-parameter text
//! file, e.g. `#GHz S RI 50`: axis unit, parameter kind, value
//! representation, and reference impedance.

use crate::constants::DEFAULT_IMPEDANCE;

/// Axis unit keyword.
///
/// Frequency units cover ordinary network-parameter files; time and angle
/// units cover the derived waveform/beamform variants that reuse the same
/// one-port column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    Hz,
    KHz,
    MHz,
    #[default]
    GHz,
    THz,
    Ns,
    Us,
    Ms,
    S,
    Deg,
    Rad,
}

impl Unit {
    /// Multiplier converting a value in this unit to the base unit
    /// (Hz, seconds, or radians).
    pub fn multiplier(&self) -> f64 {
        match self {
            Unit::Hz => 1.0,
            Unit::KHz => 1e3,
            Unit::MHz => 1e6,
            Unit::GHz => 1e9,
            Unit::THz => 1e12,
            Unit::Ns => 1e-9,
            Unit::Us => 1e-6,
            Unit::Ms => 1e-3,
            Unit::S => 1.0,
            Unit::Deg => std::f64::consts::PI / 180.0,
            Unit::Rad => 1.0,
        }
    }

    /// Parse from a header token (case-insensitive).
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hz" => Some(Unit::Hz),
            "khz" => Some(Unit::KHz),
            "mhz" => Some(Unit::MHz),
            "ghz" => Some(Unit::GHz),
            "thz" => Some(Unit::THz),
            "ns" => Some(Unit::Ns),
            "us" => Some(Unit::Us),
            "ms" => Some(Unit::Ms),
            "s" => Some(Unit::S),
            "deg" => Some(Unit::Deg),
            "rad" => Some(Unit::Rad),
            _ => None,
        }
    }

    /// Token used when serializing a header line.
    pub fn token(&self) -> &'static str {
        match self {
            Unit::Hz => "Hz",
            Unit::KHz => "kHz",
            Unit::MHz => "MHz",
            Unit::GHz => "GHz",
            Unit::THz => "THz",
            Unit::Ns => "ns",
            Unit::Us => "us",
            Unit::Ms => "ms",
            Unit::S => "s",
            Unit::Deg => "deg",
            Unit::Rad => "rad",
        }
    }

    /// True for Hz-class units, whose axis values are rounded to the
    /// nearest whole Hz before any write.
    pub fn is_frequency(&self) -> bool {
        matches!(
            self,
            Unit::Hz | Unit::KHz | Unit::MHz | Unit::GHz | Unit::THz
        )
    }

    /// True for time-class units (waveform axes).
    pub fn is_time(&self) -> bool {
        matches!(self, Unit::Ns | Unit::Us | Unit::Ms | Unit::S)
    }

    /// True for angle-class units (beamform axes).
    pub fn is_angle(&self) -> bool {
        matches!(self, Unit::Deg | Unit::Rad)
    }
}

/// Parameter kind keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    #[default]
    S,
}

impl ParameterKind {
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "S" => Some(ParameterKind::S),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            ParameterKind::S => "S",
        }
    }
}

/// Value representation keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representation {
    /// Real/imaginary pairs.
    #[default]
    RealImag,
}

impl Representation {
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RI" => Some(Representation::RealImag),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Representation::RealImag => "RI",
        }
    }
}

/// One-line format descriptor of a network-parameter file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub unit: Unit,
    pub kind: ParameterKind,
    pub representation: Representation,
    pub impedance: f64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            unit: Unit::GHz,
            kind: ParameterKind::S,
            representation: Representation::RealImag,
            impedance: DEFAULT_IMPEDANCE,
        }
    }
}

impl Header {
    /// Parse a header line (with or without the leading `#`).
    ///
    /// Returns `None` when any token is unrecognized. Callers keep their
    /// previous header in that case, so a malformed or hand-edited line
    /// never corrupts a correctly-initialized default. An `R` token
    /// before the impedance is tolerated for Touchstone-style lines.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().trim_start_matches('#');
        let tokens: Vec<&str> = body.split_whitespace().collect();
        if tokens.len() < 3 {
            return None;
        }

        let unit = Unit::from_token(tokens[0])?;
        let kind = ParameterKind::from_token(tokens[1])?;
        let representation = Representation::from_token(tokens[2])?;

        let impedance = match tokens.get(3) {
            Some(&"R") | Some(&"r") => tokens.get(4).and_then(|t| t.parse::<f64>().ok()),
            Some(t) => t.parse::<f64>().ok(),
            None => None,
        }
        .unwrap_or(DEFAULT_IMPEDANCE);

        Some(Self {
            unit,
            kind,
            representation,
            impedance,
        })
    }

    /// Serialize without the leading `#`.
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.unit.token(),
            self.kind.token(),
            self.representation.token(),
            self.impedance
        )
    }
}
