use std::path::PathBuf;

use clap::{ArgAction, Parser};
use syncset::GeneratorConfig;

/// Generate a SelectorSyncSet template from a directory of Kubernetes manifests.
#[derive(Debug, Parser)]
#[command(name = "syncset-gen", version, about)]
pub struct Args {
    /// Directory containing template.yaml and selectorsyncset.yaml
    #[arg(short = 't', long, env = "SYNCSET_TEMPLATE_DIR")]
    pub template_dir: PathBuf,

    /// Directory containing the manifests, one subdirectory per bundle
    #[arg(short = 'y', long, env = "SYNCSET_YAML_DIRECTORY")]
    pub yaml_directory: PathBuf,

    /// File to write the generated template to
    #[arg(short = 'd', long, env = "SYNCSET_DESTINATION")]
    pub destination: PathBuf,

    /// Name of the repository, used for REPO_NAME and bundle names
    #[arg(short = 'r', long, env = "SYNCSET_REPO_NAME")]
    pub repo_name: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn into_config(self) -> GeneratorConfig {
        GeneratorConfig::new(
            self.template_dir,
            self.yaml_directory,
            self.destination,
            self.repo_name,
        )
    }
}
