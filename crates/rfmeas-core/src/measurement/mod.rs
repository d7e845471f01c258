//! Measurement records and uncertainty ensembles
//!
//! A measurement is a nominal realization plus two ensembles of
//! repeated realizations (Monte Carlo and perturbed), with statistics
//! computed over the ensembles and persistence to an XML or JSON
//! bundle.

mod bundle;
mod ensemble;
mod realization;
mod record;
pub mod statistics;

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::matrix::MatrixError;

pub use ensemble::{
    EnsembleKind, EnsembleState, EnsembleStatistics, UncertaintyBand, UncertaintyEnsemble,
};
pub use realization::Realization;
pub use record::{LoadOptions, MeasurementRecord};

/// Measurement-layer errors
#[derive(Error, Debug)]
pub enum MeasurementError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("referenced file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("realization {0:?} has no loaded data")]
    NotLoaded(String),

    #[error("malformed bundle: {0}")]
    Bundle(String),
}
