//! N-port network-parameter matrix and associated operations
//!
//! Provides the core matrix container (ports x waves x frequency of
//! complex values), the per-column [`ParameterSeries`] view, port
//! algebra, and the frequency-to-time transform.

mod core;
mod ports;
mod series;
mod time_domain;

pub use core::{pair_key, pair_ports, MatrixError, NetworkParameterMatrix, PortKeyStrategy, Wave};
pub use ports::{combine_parameters, split_parameters};
pub use series::ParameterSeries;
pub use time_domain::Window;
