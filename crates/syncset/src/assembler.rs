//! Assembles the final template from a manifest tree.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_yaml::Value;

use crate::classifier::classify;
use crate::config::GeneratorConfig;
use crate::error::{Result, SyncSetError};
use crate::loader::{read_document, ManifestLoader};
use crate::template::{bundle_name, SyncSetSkeleton, Template, REPO_NAME_PARAMETER};

/// What was generated for one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    pub name: String,
    pub directory: PathBuf,
    pub patches: usize,
    pub resources: usize,
    pub skipped: usize,
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// One entry per bundle appended to the template, in output order.
    pub bundles: Vec<BundleSummary>,
    /// Directories with files but without any YAML document.
    pub skipped_directories: Vec<PathBuf>,
}

impl AssemblyReport {
    pub fn total_patches(&self) -> usize {
        self.bundles.iter().map(|b| b.patches).sum()
    }

    pub fn total_resources(&self) -> usize {
        self.bundles.iter().map(|b| b.resources).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.bundles.iter().map(|b| b.skipped).sum()
    }
}

/// Builds a SelectorSyncSet template from a [`GeneratorConfig`].
pub struct Assembler {
    config: GeneratorConfig,
    loader: ManifestLoader,
}

impl Assembler {
    pub fn new(config: GeneratorConfig) -> Self {
        let loader = ManifestLoader::new(config.manifest_dir.clone());
        Self { config, loader }
    }

    /// Reads `template.yaml` and `selectorsyncset.yaml` from the template directory.
    pub fn load_skeletons(&self) -> Result<(Template, SyncSetSkeleton)> {
        let template = Template::from_value(read_document(&self.config.template_path())?)?;
        let skeleton =
            SyncSetSkeleton::from_value(read_document(&self.config.selectorsyncset_path())?)?;
        Ok((template, skeleton))
    }

    /// Sets `REPO_NAME` and appends one bundle per manifest directory.
    ///
    /// The template is taken by value and handed back once every directory
    /// has been folded into it.
    pub fn assemble(
        &self,
        mut template: Template,
        skeleton: &SyncSetSkeleton,
    ) -> Result<(Template, AssemblyReport)> {
        if !template.set_parameter(REPO_NAME_PARAMETER, &self.config.repo_name) {
            warn!(
                "Template has no {} parameter, leaving parameters unchanged",
                REPO_NAME_PARAMETER
            );
        }

        let mut report = AssemblyReport::default();

        for dir in self.loader.directories()? {
            match self.bundle_for(&dir, skeleton)? {
                Some((bundle, summary)) => {
                    info!(
                        "Bundle {}: {} resources, {} patches, {} skipped",
                        summary.name, summary.resources, summary.patches, summary.skipped
                    );
                    template.push_object(bundle);
                    report.bundles.push(summary);
                }
                None => {
                    debug!("No manifests in {}, no bundle", dir.display());
                    report.skipped_directories.push(dir);
                }
            }
        }

        Ok((template, report))
    }

    /// Loads, classifies and instantiates the bundle for one directory.
    fn bundle_for(
        &self,
        dir: &Path,
        skeleton: &SyncSetSkeleton,
    ) -> Result<Option<(Value, BundleSummary)>> {
        let manifests = self.loader.load_dir(dir)?;
        let Some(classification) = classify(manifests) else {
            return Ok(None);
        };

        let name = bundle_name(self.loader.root(), dir, &self.config.repo_name);
        let summary = BundleSummary {
            name: name.clone(),
            directory: dir.to_path_buf(),
            patches: classification.patches.len(),
            resources: classification.resources.len(),
            skipped: classification.skipped_count(),
        };

        let bundle = skeleton.instantiate(&name, classification)?;
        Ok(Some((bundle, summary)))
    }

    /// Produces the serialized template without writing it.
    pub fn generate(&self) -> Result<(String, AssemblyReport)> {
        let (template, skeleton) = self.load_skeletons()?;
        let (template, report) = self.assemble(template, &skeleton)?;
        Ok((template.to_yaml()?, report))
    }

    /// Validates the configuration, generates the template and writes it to
    /// the destination.
    pub fn run(&self) -> Result<AssemblyReport> {
        self.config.validate()?;

        let (yaml, report) = self.generate()?;
        write_output(&self.config.destination, &yaml)?;

        info!(
            "Wrote {} bundles to {}",
            report.bundles.len(),
            self.config.destination.display()
        );
        Ok(report)
    }
}

/// Writes `content` to `path`, creating the parent directory if needed.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SyncSetError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(path, content).map_err(|e| SyncSetError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}
