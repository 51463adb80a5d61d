//! Generator configuration.

use std::path::{Path, PathBuf};

use crate::error::{Result, SyncSetError};

/// File name of the template skeleton inside the template directory.
pub const TEMPLATE_FILE: &str = "template.yaml";

/// File name of the SelectorSyncSet skeleton inside the template directory.
pub const SELECTORSYNCSET_FILE: &str = "selectorsyncset.yaml";

/// Inputs of a single generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory holding `template.yaml` and `selectorsyncset.yaml`.
    pub template_dir: PathBuf,
    /// Root of the manifest tree.
    pub manifest_dir: PathBuf,
    /// Where the generated template is written.
    pub destination: PathBuf,
    /// Repository name, used for `REPO_NAME` and as bundle name prefix.
    pub repo_name: String,
}

impl GeneratorConfig {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        manifest_dir: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            manifest_dir: manifest_dir.into(),
            destination: destination.into(),
            repo_name: repo_name.into(),
        }
    }

    pub fn template_path(&self) -> PathBuf {
        self.template_dir.join(TEMPLATE_FILE)
    }

    pub fn selectorsyncset_path(&self) -> PathBuf {
        self.template_dir.join(SELECTORSYNCSET_FILE)
    }

    /// Checks that the input directories exist and the repo name is usable.
    pub fn validate(&self) -> Result<()> {
        check_dir(&self.template_dir)?;
        check_dir(&self.manifest_dir)?;

        if self.repo_name.trim().is_empty() {
            return Err(SyncSetError::InvalidConfig(
                "repository name must not be empty".to_string(),
            ));
        }

        if self.destination.as_os_str().is_empty() {
            return Err(SyncSetError::InvalidConfig(
                "destination must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SyncSetError::DirectoryNotFound(path.to_path_buf()))
    }
}
