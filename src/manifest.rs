//! The run manifest: which files to reconcile, under which supplier, with which
//! human-confirmed column mapping.
//!
//! `suggest --manifest-out` writes a skeleton with fuzzy suggestions filled in;
//! the reviewer corrects it and hands it to `merge`.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    cli::parse_delimiter,
    io_utils,
    mapping::ColumnMapping,
    source::{self, SourceOptions, SourceTable},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
    /// Display name used in warnings; defaults to the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default)]
    pub mapping: ColumnMapping,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>, company: impl Into<String>, mapping: ColumnMapping) -> Self {
        Self {
            path: path.into(),
            name: None,
            company: company.into(),
            sheet: None,
            delimiter: None,
            encoding: None,
            mapping,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }

    pub fn options(&self) -> Result<SourceOptions> {
        let delimiter = self
            .delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(|err| anyhow!("Invalid delimiter for {:?}: {err}", self.path))?;
        Ok(SourceOptions {
            delimiter,
            encoding: io_utils::resolve_encoding(self.encoding.as_deref())?,
            sheet: self.sheet.clone(),
        })
    }

    /// Reads the source, resolving a relative path against `base_dir`.
    pub fn load_table(&self, base_dir: &Path) -> Result<SourceTable> {
        let path = if self.path.is_relative() && !io_utils::is_dash(&self.path) {
            base_dir.join(&self.path)
        } else {
            self.path.clone()
        };
        source::load(&path, &self.display_name(), &self.options()?)
            .with_context(|| format!("Loading source {path:?}"))
    }
}

impl RunManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening manifest {path:?}"))?;
        let manifest: RunManifest = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing manifest {path:?}"))?;
        if manifest.sources.is_empty() {
            return Err(anyhow!("Manifest {path:?} does not list any sources"));
        }
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating manifest {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing manifest YAML")
    }

    /// Directory relative source paths are resolved against.
    pub fn base_dir(path: &Path) -> PathBuf {
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CanonicalField;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_mapping_with_unassigned_columns() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "sources:\n  - path: adarsh.csv\n    company: Adarsh\n    delimiter: ';'\n    mapping:\n      - column: Book Title\n        field: TITLE\n      - column: Qty\n        field: null\n      - column: Notes\n"
        )
        .unwrap();
        let manifest = RunManifest::load(file.path()).unwrap();
        let entry = &manifest.sources[0];
        assert_eq!(entry.display_name(), "adarsh.csv");
        assert_eq!(entry.company, "Adarsh");
        assert_eq!(entry.options().unwrap().delimiter, Some(b';'));
        assert_eq!(
            entry.mapping.field_for("Book Title"),
            Some(CanonicalField::Title)
        );
        assert_eq!(entry.mapping.field_for("Qty"), None);
        assert_eq!(entry.mapping.assignments().len(), 3);
    }

    #[test]
    fn rejects_empty_manifest() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sources: []").unwrap();
        assert!(RunManifest::load(file.path()).is_err());
    }

    #[test]
    fn base_dir_defaults_to_current_directory() {
        assert_eq!(RunManifest::base_dir(Path::new("run.yaml")), PathBuf::from("."));
        assert_eq!(
            RunManifest::base_dir(Path::new("/tmp/jobs/run.yaml")),
            PathBuf::from("/tmp/jobs")
        );
    }
}
