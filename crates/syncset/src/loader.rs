//! Loading of manifest directories and template skeletons.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_yaml::Value;
use walkdir::WalkDir;

use crate::error::{Result, SyncSetError};
use crate::manifest::Manifest;

/// Returns true for `.yml` and `.yaml` files.
pub fn is_yaml_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(".yml") || n.ends_with(".yaml"))
        .unwrap_or(false)
}

/// Reads a single YAML document, such as one of the template skeletons.
pub fn read_document(path: &Path) -> Result<Value> {
    if !path.is_file() {
        return Err(SyncSetError::MissingFile(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| SyncSetError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_yaml::from_str(&content).map_err(|e| SyncSetError::ParseYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parses every document of a (possibly multi-document) YAML string.
///
/// Empty documents are skipped.
pub fn parse_documents(content: &str, path: &Path) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).map_err(|e| SyncSetError::ParseYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if value.is_null() {
            debug!("Skipping empty document in {}", path.display());
            continue;
        }

        manifests.push(Manifest::from_value(value, path)?);
    }

    Ok(manifests)
}

/// Walks a manifest tree.
pub struct ManifestLoader {
    root: PathBuf,
}

impl ManifestLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns every directory of the tree, the root included, that directly
    /// contains at least one file. Directories are sorted by path.
    pub fn directories(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(SyncSetError::DirectoryNotFound(self.root.clone()));
        }

        let mut directories = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| self.walk_error(e))?;
            if !entry.file_type().is_dir() {
                continue;
            }

            if self.entries(entry.path())?.iter().any(|p| !p.is_dir()) {
                directories.push(entry.into_path());
            } else {
                debug!("No files in {}", entry.path().display());
            }
        }

        Ok(directories)
    }

    /// Lists the YAML files directly inside `dir`, sorted by name.
    ///
    /// Subdirectories are not descended into; they are visited as
    /// directories of their own.
    pub fn list_yaml_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .entries(dir)?
            .into_iter()
            .filter(|p| p.is_file() && is_yaml_file(p))
            .collect())
    }

    /// Loads every document from the YAML files directly inside `dir`.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<Manifest>> {
        let mut manifests = Vec::new();
        for file in self.list_yaml_files(dir)? {
            manifests.extend(self.load_file(&file)?);
        }
        Ok(manifests)
    }

    /// Loads every document from a single file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Manifest>> {
        let content = fs::read_to_string(path).map_err(|e| SyncSetError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let manifests = parse_documents(&content, path)?;
        debug!(
            "Loaded {} documents from {}",
            manifests.len(),
            path.display()
        );
        Ok(manifests)
    }

    /// Direct children of `dir`, sorted by name.
    fn entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| self.walk_error(e))?;
            entries.push(entry.into_path());
        }
        Ok(entries)
    }

    fn walk_error(&self, err: walkdir::Error) -> SyncSetError {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        SyncSetError::ReadDirectory { path, source: err }
    }
}
