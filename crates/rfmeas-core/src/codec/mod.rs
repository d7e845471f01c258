//! Network-parameter file I/O
//!
//! Text and binary codecs over [`NetworkParameterMatrix`], plus the file
//! extension grammar (`s2p`, `w3p_binary`, `waveform`, ...) that names
//! the port count, wave set, and encoding of a file.

mod binary;
mod text;

use std::path::{Path, PathBuf};

use num_complex::Complex64;
use thiserror::Error;

use crate::header::Header;
use crate::matrix::{NetworkParameterMatrix, Wave};

pub use binary::{read_binary, read_binary_from, write_binary_to};
pub use text::{read_text, read_text_from, write_text_to};

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file extension: {0}")]
    InvalidExtension(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("malformed file: data columns imply {implied} ports, extension implies {expected}")]
    MalformedFile { expected: usize, implied: usize },
}

/// Explicit codec configuration.
///
/// `default_header` and `default_comments` seed the metadata of files
/// that carry none (binary files, headerless text files). Setting
/// `read_header` to false ignores `#` lines entirely and keeps the
/// default.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    pub default_header: Header,
    pub default_comments: Vec<String>,
    pub read_header: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            default_header: Header::default(),
            default_comments: Vec::new(),
            read_header: true,
        }
    }
}

/// On-disk encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Binary,
}

/// Axis family named by a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisClass {
    Frequency,
    Time,
    Angle,
}

/// What a file extension says about the file's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionInfo {
    pub waves: Vec<Wave>,
    pub num_ports: usize,
    pub format: Format,
    pub axis: AxisClass,
}

impl ExtensionInfo {
    /// Total data columns of one logical row: the axis column plus one
    /// real/imaginary pair per (wave, port-pair).
    pub fn expected_columns(&self) -> usize {
        1 + 2 * self.waves.len() * self.num_ports * self.num_ports
    }
}

/// Parse a path's extension per the `{s|w|t}<N>p[_binary]` grammar,
/// with `waveform`/`beamform` naming the one-port time/angle variants.
pub fn parse_extension<P: AsRef<Path>>(path: P) -> Result<ExtensionInfo, CodecError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| CodecError::InvalidExtension(path.display().to_string()))?
        .to_lowercase();

    let (body, format) = match ext.strip_suffix("_binary") {
        Some(body) => (body, Format::Binary),
        None => (ext.as_str(), Format::Text),
    };

    match body {
        "waveform" => {
            return Ok(ExtensionInfo {
                waves: vec![Wave::S],
                num_ports: 1,
                format,
                axis: AxisClass::Time,
            })
        }
        "beamform" => {
            return Ok(ExtensionInfo {
                waves: vec![Wave::S],
                num_ports: 1,
                format,
                axis: AxisClass::Angle,
            })
        }
        _ => {}
    }

    let invalid = || CodecError::InvalidExtension(ext.clone());
    let mut chars = body.chars();
    let letter = chars.next().ok_or_else(invalid)?;
    let waves = match letter {
        's' => vec![Wave::S],
        'w' => vec![Wave::A, Wave::B],
        't' => vec![Wave::T],
        _ => return Err(invalid()),
    };

    let rest: String = chars.collect();
    let digits = rest.strip_suffix('p').ok_or_else(invalid)?;
    let num_ports: usize = digits.parse().map_err(|_| invalid())?;
    if num_ports == 0 {
        return Err(invalid());
    }

    Ok(ExtensionInfo {
        waves,
        num_ports,
        format,
        axis: AxisClass::Frequency,
    })
}

/// The canonical extension for a matrix: always reflects the true wave
/// set, port count, and encoding, even when the caller's path carries a
/// stale name.
pub fn canonical_extension(matrix: &NetworkParameterMatrix, format: Format) -> String {
    let body = if matrix.header.unit.is_time() {
        "waveform".to_string()
    } else if matrix.header.unit.is_angle() {
        "beamform".to_string()
    } else {
        let letter = match matrix.waves() {
            [Wave::A, Wave::B] => 'w',
            [Wave::T] => 't',
            _ => 's',
        };
        format!("{}{}p", letter, matrix.num_ports())
    };
    match format {
        Format::Text => body,
        Format::Binary => format!("{}_binary", body),
    }
}

/// A dense numeric table as stored on disk: column 0 is the axis, the
/// rest alternate real/imaginary per (wave, port-pair).
#[derive(Debug, Clone)]
pub struct RawTable {
    pub rows: Vec<Vec<f64>>,
    pub header: Header,
    pub comments: Vec<String>,
}

/// Read a network-parameter file, dispatching on its extension.
pub fn read<P: AsRef<Path>>(
    path: P,
    options: &CodecOptions,
) -> Result<NetworkParameterMatrix, CodecError> {
    let path = path.as_ref();
    let info = parse_extension(path)?;
    let raw = match info.format {
        Format::Text => text::read_text(path, &info, options)?,
        Format::Binary => binary::read_binary(path, &info, options)?,
    };
    tracing::debug!(
        path = %path.display(),
        rows = raw.rows.len(),
        ports = info.num_ports,
        "read network-parameter file"
    );
    let mut matrix = matrix_from_raw(&raw, &info);
    matrix.name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string());
    Ok(matrix)
}

/// Write a matrix, returning the path actually written.
///
/// With `fix_extension` set, the output path's extension is rewritten
/// to the canonical form for this matrix and format.
pub fn write<P: AsRef<Path>>(
    matrix: &NetworkParameterMatrix,
    path: P,
    format: Format,
    fix_extension: bool,
) -> Result<PathBuf, CodecError> {
    let mut path = path.as_ref().to_path_buf();
    if fix_extension {
        path.set_extension(canonical_extension(matrix, format));
    }

    let rows = rows_from_matrix(matrix);
    match format {
        Format::Text => {
            let file = std::fs::File::create(&path)?;
            let mut writer = std::io::BufWriter::new(file);
            text::write_text_to(&mut writer, &rows, &matrix.header, &matrix.comments)?;
        }
        Format::Binary => {
            let file = std::fs::File::create(&path)?;
            let mut writer = std::io::BufWriter::new(file);
            binary::write_binary_to(&mut writer, &rows)?;
        }
    }
    tracing::debug!(
        path = %path.display(),
        rows = rows.len(),
        "wrote network-parameter file"
    );
    Ok(path)
}

/// Build a matrix from a parsed table. Axis values are scaled to the
/// base unit by the header's multiplier.
pub fn matrix_from_raw(raw: &RawTable, info: &ExtensionInfo) -> NetworkParameterMatrix {
    let multiplier = raw.header.unit.multiplier();
    let frequencies: Vec<f64> = raw.rows.iter().map(|r| r[0] * multiplier).collect();

    let mut matrix = NetworkParameterMatrix::with_port_count(
        info.num_ports,
        info.waves.clone(),
        frequencies,
        raw.header,
    );
    matrix.comments = raw.comments.clone();

    let pairs = matrix.pairs().to_vec();
    let waves = matrix.waves().to_vec();
    let npairs = pairs.len();
    for (wi, &w) in waves.iter().enumerate() {
        for (pi, &p) in pairs.iter().enumerate() {
            let base = 1 + 2 * (wi * npairs + pi);
            let column: Vec<Complex64> = raw
                .rows
                .iter()
                .map(|row| Complex64::new(row[base], row[base + 1]))
                .collect();
            // Shape is consistent by construction.
            let _ = matrix.set_column(w, p, &column);
        }
    }
    matrix
}

/// Flatten a matrix back into the on-disk column layout, with the axis
/// column scaled to the header's unit.
pub fn rows_from_matrix(matrix: &NetworkParameterMatrix) -> Vec<Vec<f64>> {
    let multiplier = matrix.header.unit.multiplier();
    let round = matrix.header.unit.is_frequency();
    let ncols = 1 + 2 * matrix.waves().len() * matrix.pairs().len();

    let mut rows = Vec::with_capacity(matrix.npoints());
    for (k, &f) in matrix.frequencies().iter().enumerate() {
        let f = if round { f.round() } else { f };
        let mut row = Vec::with_capacity(ncols);
        row.push(f / multiplier);
        for &w in matrix.waves() {
            for &p in matrix.pairs() {
                // Columns exist for every enumerated key.
                if let Some(col) = matrix.column(w, p) {
                    row.push(col[k].re);
                    row.push(col[k].im);
                }
            }
        }
        rows.push(row);
    }
    rows
}

/// `round(sqrt((cols - 1) / (2 * num_waves)))`: the port count a column
/// count implies, used for malformed-file diagnostics.
pub(crate) fn implied_ports(cols: usize, num_waves: usize) -> usize {
    if cols < 1 || num_waves == 0 {
        return 0;
    }
    (((cols - 1) as f64) / (2.0 * num_waves as f64)).sqrt().round() as usize
}
