//! rfmeas-core: storage, exchange, and statistics for network-parameter measurements
//!
//! Handles multi-port complex frequency-domain measurements (scattering and
//! wave parameters) together with repeated realizations of the same
//! measurement used to quantify uncertainty.
//!
//! ## Modules
//!
//! - `header` - Format descriptor line (unit, parameter kind, representation, impedance)
//! - `matrix` - N-port network-parameter matrix, per-column series, port algebra
//! - `codec` - Text and binary file I/O
//! - `measurement` - Realizations, uncertainty ensembles, measurement bundles

pub mod codec;
pub mod constants;
pub mod header;
pub mod matrix;
pub mod measurement;

pub use codec::{CodecOptions, Format};
pub use header::{Header, Unit};
pub use matrix::{NetworkParameterMatrix, ParameterSeries, Wave, Window};
pub use measurement::{MeasurementRecord, Realization, UncertaintyEnsemble};
