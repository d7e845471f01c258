//! Ordered collections of realizations of one kind, with cached
//! statistics

use std::path::Path;

use super::realization::Realization;
use super::{statistics, MeasurementError};
use crate::codec::CodecOptions;
use crate::constants::{DEFAULT_CI_PERCENTAGE, MIN_STATISTICS_SAMPLES};
use crate::matrix::NetworkParameterMatrix;

/// What an ensemble's realizations represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleKind {
    /// Best-estimate measurement(s).
    Nominal,
    /// Realizations from randomly perturbed calibration inputs.
    MonteCarlo,
    /// Realizations from systematically perturbed calibration standards.
    Perturbed,
}

impl EnsembleKind {
    /// Subdirectory name used when a record writes its members.
    pub fn dir_name(&self) -> &'static str {
        match self {
            EnsembleKind::Nominal => "nominal",
            EnsembleKind::MonteCarlo => "monte_carlo",
            EnsembleKind::Perturbed => "perturbed",
        }
    }

    /// Element name in the XML bundle schema.
    pub(crate) fn xml_tag(&self) -> &'static str {
        match self {
            EnsembleKind::Nominal => "MeasSParams",
            EnsembleKind::MonteCarlo => "MonteCarloPerturbedSParams",
            EnsembleKind::Perturbed => "PerturbedSParams",
        }
    }
}

/// Lifecycle of an ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleState {
    Empty,
    Populated,
    Loaded,
    Reduced,
}

/// An upper/lower pair of derived matrices.
#[derive(Debug, Clone)]
pub struct UncertaintyBand {
    pub upper: NetworkParameterMatrix,
    pub lower: NetworkParameterMatrix,
}

/// Cached reduction results of one ensemble.
#[derive(Debug, Clone)]
pub struct EnsembleStatistics {
    pub estimate: NetworkParameterMatrix,
    pub confidence_interval: UncertaintyBand,
    pub standard_uncertainty: UncertaintyBand,
}

/// An ordered collection of realizations of one kind.
///
/// Statistics are cached after [`calculate_statistics`] and invalidated
/// by any change to the realization list.
///
/// [`calculate_statistics`]: UncertaintyEnsemble::calculate_statistics
#[derive(Debug, Clone)]
pub struct UncertaintyEnsemble {
    kind: EnsembleKind,
    items: Vec<Realization>,
    ci_percentage: f64,
    statistics: Option<EnsembleStatistics>,
}

impl UncertaintyEnsemble {
    pub fn new(kind: EnsembleKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            ci_percentage: DEFAULT_CI_PERCENTAGE,
            statistics: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> EnsembleKind {
        self.kind
    }

    #[inline]
    pub fn items(&self) -> &[Realization] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [Realization] {
        &mut self.items
    }

    /// The first realization, if any.
    pub fn first(&self) -> Option<&Realization> {
        self.items.first()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn ci_percentage(&self) -> f64 {
        self.ci_percentage
    }

    /// Change the confidence-interval percentage, dropping any cached
    /// reduction computed with the old one.
    pub fn set_ci_percentage(&mut self, percentage: f64) {
        self.ci_percentage = percentage;
        self.statistics = None;
    }

    /// Append a realization, invalidating cached statistics.
    pub fn add_item(&mut self, item: Realization) {
        self.items.push(item);
        self.statistics = None;
    }

    /// Drop every realization and any cached statistics.
    pub fn clear_items(&mut self) {
        self.items.clear();
        self.statistics = None;
    }

    /// True when every realization has its matrix in memory.
    pub fn is_loaded(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(Realization::is_loaded)
    }

    pub fn state(&self) -> EnsembleState {
        if self.items.is_empty() {
            EnsembleState::Empty
        } else if self.statistics.is_some() {
            EnsembleState::Reduced
        } else if self.is_loaded() {
            EnsembleState::Loaded
        } else {
            EnsembleState::Populated
        }
    }

    /// Read every member's referenced file into memory.
    ///
    /// A sequential scan that fails fast: one missing or malformed file
    /// aborts the whole call, since downstream statistics assume a
    /// complete sample set.
    pub fn load_data(
        &mut self,
        working_dir: Option<&Path>,
        options: &CodecOptions,
    ) -> Result<(), MeasurementError> {
        for item in &mut self.items {
            item.load(working_dir, options)?;
        }
        tracing::debug!(
            kind = ?self.kind,
            count = self.items.len(),
            "loaded ensemble data"
        );
        Ok(())
    }

    /// Reduce the ensemble to estimate, confidence interval, and
    /// standard uncertainty, loading data first if needed.
    ///
    /// Ensembles of two or fewer realizations are left untouched: no
    /// statistics appear and no error is raised. External tooling
    /// depends on that silence.
    pub fn calculate_statistics(
        &mut self,
        working_dir: Option<&Path>,
        options: &CodecOptions,
    ) -> Result<(), MeasurementError> {
        if self.items.len() <= MIN_STATISTICS_SAMPLES {
            tracing::debug!(
                kind = ?self.kind,
                count = self.items.len(),
                "ensemble too small for statistics, skipping"
            );
            return Ok(());
        }

        if !self.is_loaded() {
            self.load_data(working_dir, options)?;
        }

        let members: Vec<&NetworkParameterMatrix> =
            self.items.iter().filter_map(|r| r.data.as_ref()).collect();
        if members.len() != self.items.len() {
            // load_data fills every member, so this only fires if a
            // caller cleared `data` behind our back.
            return Err(MeasurementError::NotLoaded(
                self.kind.dir_name().to_string(),
            ));
        }

        let estimate = statistics::estimate(&members)?;
        let (ci_upper, ci_lower) = statistics::confidence_interval(&members, self.ci_percentage)?;
        let (su_upper, su_lower) = statistics::standard_uncertainty(&members)?;

        self.statistics = Some(EnsembleStatistics {
            estimate,
            confidence_interval: UncertaintyBand {
                upper: ci_upper,
                lower: ci_lower,
            },
            standard_uncertainty: UncertaintyBand {
                upper: su_upper,
                lower: su_lower,
            },
        });
        tracing::info!(
            kind = ?self.kind,
            count = self.items.len(),
            ci = self.ci_percentage,
            "computed ensemble statistics"
        );
        Ok(())
    }

    pub fn statistics(&self) -> Option<&EnsembleStatistics> {
        self.statistics.as_ref()
    }

    pub fn estimate(&self) -> Option<&NetworkParameterMatrix> {
        self.statistics.as_ref().map(|s| &s.estimate)
    }

    pub fn confidence_interval(&self) -> Option<&UncertaintyBand> {
        self.statistics.as_ref().map(|s| &s.confidence_interval)
    }

    pub fn standard_uncertainty(&self) -> Option<&UncertaintyBand> {
        self.statistics.as_ref().map(|s| &s.standard_uncertainty)
    }
}
