//! Generates a SelectorSyncSet template from a tree of Kubernetes manifests.
//!
//! Every directory of the manifest tree that holds files becomes one
//! SelectorSyncSet in the template's `objects`. The operator's own
//! Deployment, ServiceAccount and the RBAC bound to it are left out, the
//! remaining documents are split into `spec.patches` and `spec.resources`.

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod template;

pub use assembler::{Assembler, AssemblyReport, BundleSummary};
pub use classifier::{classify, Classification, Classifier, SkipReason, SkippedManifest};
pub use config::GeneratorConfig;
pub use error::{Result, SyncSetError};
pub use loader::ManifestLoader;
pub use manifest::{Binding, Manifest, ManifestKind, ObjectMeta, RoleRef, Subject};
pub use template::{bundle_name, SyncSetSkeleton, Template, REPO_NAME_PARAMETER};
