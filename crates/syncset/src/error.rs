//! Error types for template generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a SelectorSyncSet template.
#[derive(Error, Debug)]
pub enum SyncSetError {
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Failed to serialize YAML: {0}")]
    SerializeYaml(String),

    #[error("Invalid manifest in '{path}': {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Required file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_yaml::Error> for SyncSetError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncSetError::SerializeYaml(err.to_string())
    }
}

/// Result type for template generation.
pub type Result<T> = std::result::Result<T, SyncSetError>;
