//! A named, lazily loaded reference to one measured matrix

use std::path::{Path, PathBuf};

use super::MeasurementError;
use crate::codec::{self, CodecOptions, Format};
use crate::matrix::NetworkParameterMatrix;

/// One concrete realization of a measurement: a file reference plus the
/// matrix parsed from it, populated on demand.
#[derive(Debug, Clone)]
pub struct Realization {
    pub name: String,
    pub file_path: PathBuf,
    pub data: Option<NetworkParameterMatrix>,
}

impl Realization {
    pub fn new(name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            data: None,
        }
    }

    /// Reference a file, naming the realization after its stem.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("measurement")
            .to_string();
        Self {
            name,
            file_path: path,
            data: None,
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// The referenced path, resolved against a working directory when
    /// relative.
    pub fn resolve_path(&self, working_dir: Option<&Path>) -> PathBuf {
        match working_dir {
            Some(dir) if self.file_path.is_relative() => dir.join(&self.file_path),
            _ => self.file_path.clone(),
        }
    }

    /// Read the referenced file into `data` if not already loaded.
    pub fn load(
        &mut self,
        working_dir: Option<&Path>,
        options: &CodecOptions,
    ) -> Result<&NetworkParameterMatrix, MeasurementError> {
        if self.data.is_none() {
            let path = self.resolve_path(working_dir);
            if !path.exists() {
                return Err(MeasurementError::MissingFile(path));
            }
            self.data = Some(codec::read(&path, options)?);
        }
        self.data
            .as_ref()
            .ok_or_else(|| MeasurementError::NotLoaded(self.name.clone()))
    }

    /// Persist this realization at `dest` and repoint `file_path` there.
    ///
    /// A never-loaded realization is copied from its referenced file
    /// verbatim; a loaded one is serialized from `data`.
    pub fn write_to(
        &mut self,
        dest: &Path,
        working_dir: Option<&Path>,
    ) -> Result<(), MeasurementError> {
        match &self.data {
            Some(matrix) => {
                let format = codec::parse_extension(dest)
                    .map(|info| info.format)
                    .unwrap_or(Format::Text);
                codec::write(matrix, dest, format, false)?;
            }
            None => {
                let src = self.resolve_path(working_dir);
                if !src.exists() {
                    return Err(MeasurementError::MissingFile(src));
                }
                std::fs::copy(&src, dest)?;
            }
        }
        self.file_path = dest.to_path_buf();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_names_after_stem() {
        let r = Realization::from_file("data/run_003.s2p");
        assert_eq!(r.name, "run_003");
        assert!(!r.is_loaded());
    }

    #[test]
    fn test_resolve_path() {
        let r = Realization::new("x", "sub/file.s1p");
        assert_eq!(
            r.resolve_path(Some(Path::new("/base"))),
            PathBuf::from("/base/sub/file.s1p")
        );
        assert_eq!(r.resolve_path(None), PathBuf::from("sub/file.s1p"));

        let abs = Realization::new("x", "/abs/file.s1p");
        assert_eq!(
            abs.resolve_path(Some(Path::new("/base"))),
            PathBuf::from("/abs/file.s1p")
        );
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let mut r = Realization::new("x", "/definitely/not/here.s1p");
        assert!(matches!(
            r.load(None, &CodecOptions::default()),
            Err(MeasurementError::MissingFile(_))
        ));
    }
}
