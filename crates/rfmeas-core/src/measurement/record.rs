//! Top-level measurement record and bundle persistence
//!
//! Aggregates the nominal realization(s) and the two uncertainty
//! ensembles, and persists the whole bundle as an XML (`.meas`) or JSON
//! (`.smeas`) sidecar next to a directory of data files.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;

use super::bundle;
use super::ensemble::{EnsembleKind, UncertaintyEnsemble};
use super::realization::Realization;
use super::MeasurementError;
use crate::codec::{self, CodecOptions, Format};

/// How much referenced data to read when opening a bundle.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Eagerly read the nominal realization(s).
    pub load_nominal: bool,
    /// Eagerly read both ensembles.
    pub load_statistics: bool,
    pub codec: CodecOptions,
}

/// One measurement: nominal data, Monte Carlo and perturbed ensembles,
/// and provenance metadata.
#[derive(Debug, Clone)]
pub struct MeasurementRecord {
    pub(crate) nominal: Vec<Realization>,
    pub(crate) monte_carlo: UncertaintyEnsemble,
    pub(crate) perturbed: UncertaintyEnsemble,
    pub(crate) file_path: Option<PathBuf>,
    pub user_name: String,
    pub creation_time: String,
    /// Reference to the calibration used, if any.
    pub calibration: Option<String>,
}

impl Default for MeasurementRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementRecord {
    pub fn new() -> Self {
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            nominal: Vec::new(),
            monte_carlo: UncertaintyEnsemble::new(EnsembleKind::MonteCarlo),
            perturbed: UncertaintyEnsemble::new(EnsembleKind::Perturbed),
            file_path: None,
            user_name,
            creation_time: Utc::now().to_rfc3339(),
            calibration: None,
        }
    }

    /// Open a bundle file, or auto-wrap a bare network-parameter file
    /// as the sole nominal realization.
    pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self, MeasurementError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let mut record = match ext.as_str() {
            "meas" => bundle::read_xml(path)?,
            "smeas" => bundle::read_json(path)?,
            _ => {
                // A recognized data extension becomes a one-realization
                // bundle; anything else is rejected by the grammar.
                codec::parse_extension(path)?;
                let mut record = Self::new();
                record.nominal.push(Realization::from_file(path));
                record
            }
        };
        record.file_path = Some(path.to_path_buf());

        let working = path.parent().map(Path::to_path_buf);
        let working = working.as_deref();
        if options.load_nominal {
            for item in &mut record.nominal {
                item.load(working, &options.codec)?;
            }
        }
        if options.load_statistics {
            record.monte_carlo.load_data(working, &options.codec)?;
            record.perturbed.load_data(working, &options.codec)?;
        }
        Ok(record)
    }

    /// The bundle file path, once loaded or written.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// The first nominal realization.
    pub fn nominal(&self) -> Option<&Realization> {
        self.nominal.first()
    }

    pub fn nominal_items(&self) -> &[Realization] {
        &self.nominal
    }

    /// Replace the nominal realization(s) with a single one.
    pub fn set_nominal(&mut self, item: Realization) {
        self.nominal.clear();
        self.nominal.push(item);
    }

    pub fn monte_carlo(&self) -> &UncertaintyEnsemble {
        &self.monte_carlo
    }

    pub fn monte_carlo_mut(&mut self) -> &mut UncertaintyEnsemble {
        &mut self.monte_carlo
    }

    pub fn perturbed(&self) -> &UncertaintyEnsemble {
        &self.perturbed
    }

    pub fn perturbed_mut(&mut self) -> &mut UncertaintyEnsemble {
        &mut self.perturbed
    }

    /// Persist the record at `path`.
    ///
    /// Every referenced data file is written into a support directory
    /// named after the bundle (nominal members at its top level, each
    /// ensemble in a per-kind subdirectory with sequential names), the
    /// realizations are repointed at the written copies, and finally
    /// the bundle metadata itself is serialized in the format named by
    /// the extension.
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> Result<(), MeasurementError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if ext != "meas" && ext != "smeas" {
            return Err(MeasurementError::Bundle(format!(
                "unsupported bundle extension {:?}",
                ext
            )));
        }

        let support = path.with_extension("");
        std::fs::create_dir_all(&support)?;

        let old_base = self
            .file_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf);
        let old_base = old_base.as_deref();

        for (index, item) in self.nominal.iter_mut().enumerate() {
            let ext = stored_extension(item);
            let dest = support.join(format!("nominal_{}.{}", index, ext));
            item.write_to(&dest, old_base)?;
        }

        for ensemble in [&mut self.monte_carlo, &mut self.perturbed] {
            let kind = ensemble.kind();
            let sub = support.join(kind.dir_name());
            std::fs::create_dir_all(&sub)?;
            for (index, item) in ensemble.items_mut().iter_mut().enumerate() {
                let ext = stored_extension(item);
                let dest = sub.join(format!("{}_{}.{}", kind.dir_name(), index, ext));
                item.write_to(&dest, old_base)?;
            }
        }

        self.file_path = Some(path.to_path_buf());
        match ext.as_str() {
            "meas" => bundle::write_xml(self, path)?,
            _ => bundle::write_json(self, path)?,
        }
        tracing::info!(path = %path.display(), "wrote measurement bundle");
        Ok(())
    }

    /// Rewrite every realization path relative to the bundle directory.
    pub fn set_relative<P: AsRef<Path>>(&mut self, bundle_path: P) {
        let base = match bundle_path.as_ref().parent() {
            Some(dir) => dir.to_path_buf(),
            None => return,
        };
        for item in self.realizations_mut() {
            if item.file_path.is_absolute() {
                if let Some(rel) = make_relative(&base, &item.file_path) {
                    item.file_path = rel;
                }
            }
        }
    }

    /// Resolve every realization path against the bundle directory,
    /// repairing paths that no longer exist.
    ///
    /// Repair probes the bundle directory and up to 3 parent levels,
    /// re-appending the file name plus increasing amounts of its
    /// original parent path, and stops at the first existing path.
    pub fn set_absolute<P: AsRef<Path>>(&mut self, bundle_path: P) {
        let base = match bundle_path.as_ref().parent() {
            Some(dir) => dir.to_path_buf(),
            None => return,
        };
        for item in self.realizations_mut() {
            let direct = if item.file_path.is_absolute() {
                item.file_path.clone()
            } else {
                base.join(&item.file_path)
            };
            item.file_path = if direct.exists() {
                direct
            } else {
                repair_path(&base, &item.file_path).unwrap_or(direct)
            };
        }
    }

    fn realizations_mut(&mut self) -> impl Iterator<Item = &mut Realization> {
        self.nominal
            .iter_mut()
            .chain(self.monte_carlo.items_mut().iter_mut())
            .chain(self.perturbed.items_mut().iter_mut())
    }
}

/// Extension to store a realization under: canonical for loaded data,
/// the original extension for verbatim copies.
fn stored_extension(item: &Realization) -> String {
    match &item.data {
        Some(matrix) => {
            let format = codec::parse_extension(&item.file_path)
                .map(|info| info.format)
                .unwrap_or(Format::Text);
            codec::canonical_extension(matrix, format)
        }
        None => item
            .file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("s2p")
            .to_string(),
    }
}

/// Bounded fuzzy path repair for bundles moved after creation.
fn repair_path(base: &Path, original: &Path) -> Option<PathBuf> {
    let parts: Vec<&std::ffi::OsStr> = original
        .components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }

    let mut level_base = base.to_path_buf();
    for level in 0..=3 {
        if level > 0 {
            level_base = level_base.parent()?.to_path_buf();
        }
        for take in 1..=parts.len() {
            let mut candidate = level_base.clone();
            for part in &parts[parts.len() - take..] {
                candidate.push(part);
            }
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Express `target` relative to `base` where both are absolute; `None`
/// when they share no common prefix.
fn make_relative(base: &Path, target: &Path) -> Option<PathBuf> {
    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return None;
    }

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part);
    }
    Some(rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_relative() {
        assert_eq!(
            make_relative(Path::new("/a/b"), Path::new("/a/b/c/d.s2p")),
            Some(PathBuf::from("c/d.s2p"))
        );
        assert_eq!(
            make_relative(Path::new("/a/b"), Path::new("/a/x/y.s2p")),
            Some(PathBuf::from("../x/y.s2p"))
        );
    }

    #[test]
    fn test_set_relative_rewrites_absolute_paths() {
        let mut record = MeasurementRecord::new();
        record.set_nominal(Realization::new("nom", "/data/bundle/nominal_0.s2p"));
        record.set_relative("/data/bundle.meas");
        assert_eq!(
            record.nominal().unwrap().file_path,
            PathBuf::from("bundle/nominal_0.s2p")
        );
    }

    #[test]
    fn test_unsupported_bundle_extension() {
        let mut record = MeasurementRecord::new();
        let dir = tempfile::tempdir().unwrap();
        let err = record
            .write(dir.path().join("bundle.zip"))
            .unwrap_err();
        assert!(matches!(err, MeasurementError::Bundle(_)));
    }
}
