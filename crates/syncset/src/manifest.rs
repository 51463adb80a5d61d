//! Typed view over Kubernetes manifests loaded from YAML.
//!
//! Manifests are kept verbatim as [`serde_yaml::Value`] so that they can be
//! emitted unchanged. Alongside the raw document, each [`Manifest`] carries the
//! handful of fields classification cares about: the shared `kind`/`metadata`
//! header and, for RoleBindings and ClusterRoleBindings, the subjects and role
//! reference.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Result, SyncSetError};

/// Top-level key that marks a manifest as a patch rather than a resource.
pub const PATCH_KEY: &str = "patch";

/// Subject kind used for workload identities.
pub const SERVICE_ACCOUNT: &str = "ServiceAccount";

/// Role reference kind for namespaced roles.
pub const ROLE: &str = "Role";

/// Metadata shared by every manifest kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectMeta {
    /// The name of the object.
    pub name: String,

    /// The namespace, for namespaced objects.
    #[serde(default)]
    pub namespace: Option<String>,
}

/// A subject of a RoleBinding or ClusterRoleBinding.
///
/// All fields are optional on the wire; missing ones never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Subject {
    /// Returns true if the subject is a ServiceAccount.
    pub fn is_service_account(&self) -> bool {
        self.kind.as_deref() == Some(SERVICE_ACCOUNT)
    }
}

/// The `roleRef` of a binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoleRef {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Subjects and role reference of a RoleBinding or ClusterRoleBinding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    pub subjects: Vec<Subject>,
    pub role_ref: Option<RoleRef>,
}

impl Binding {
    /// Extracts binding fields from a raw document.
    ///
    /// Each subject is read on its own: a malformed entry is logged and
    /// dropped while the rest of the list is kept. A malformed `roleRef` is
    /// logged and treated as absent.
    fn from_value(value: &Value, kind: &str, name: &str) -> Self {
        let subjects = match value.get("subjects") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    serde_yaml::from_value::<Subject>(entry.clone())
                        .map_err(|e| {
                            warn!(
                                "{} '{}' has a malformed subject at index {}: {}",
                                kind, name, index, e
                            )
                        })
                        .ok()
                })
                .collect(),
            Some(_) => {
                warn!("{} '{}' has malformed subjects: not a list", kind, name);
                Vec::new()
            }
        };

        let role_ref = match value.get("roleRef") {
            None | Some(Value::Null) => None,
            Some(raw) => serde_yaml::from_value::<RoleRef>(raw.clone())
                .map_err(|e| warn!("{} '{}' has a malformed roleRef: {}", kind, name, e))
                .ok(),
        };

        Binding { subjects, role_ref }
    }

    /// Returns the `roleRef.kind`, if present.
    pub fn role_ref_kind(&self) -> Option<&str> {
        self.role_ref.as_ref().and_then(|r| r.kind.as_deref())
    }

    /// Returns the `roleRef.name`, if present.
    pub fn role_ref_name(&self) -> Option<&str> {
        self.role_ref.as_ref().and_then(|r| r.name.as_deref())
    }
}

/// The kind of a manifest, with kind-specific fields where classification
/// needs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    Deployment,
    ServiceAccount,
    Role,
    RoleBinding(Binding),
    ClusterRoleBinding(Binding),
    Other(String),
}

impl ManifestKind {
    /// Returns the Kubernetes kind name.
    pub fn as_str(&self) -> &str {
        match self {
            ManifestKind::Deployment => "Deployment",
            ManifestKind::ServiceAccount => SERVICE_ACCOUNT,
            ManifestKind::Role => ROLE,
            ManifestKind::RoleBinding(_) => "RoleBinding",
            ManifestKind::ClusterRoleBinding(_) => "ClusterRoleBinding",
            ManifestKind::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intermediate struct for parsing the header before looking at the kind.
#[derive(Debug, Deserialize)]
struct ManifestHeader {
    kind: String,
    metadata: ObjectMeta,
}

/// A single YAML document from a manifest directory.
#[derive(Debug, Clone)]
pub struct Manifest {
    kind: ManifestKind,
    metadata: ObjectMeta,
    source: PathBuf,
    value: Value,
}

impl Manifest {
    /// Builds a manifest from a parsed document.
    ///
    /// The document must be a mapping with a `kind` and a `metadata.name`.
    pub fn from_value(value: Value, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();

        if !value.is_mapping() {
            return Err(SyncSetError::InvalidManifest {
                path: source,
                message: "document is not a mapping".to_string(),
            });
        }

        let header: ManifestHeader =
            serde_yaml::from_value(value.clone()).map_err(|e| SyncSetError::InvalidManifest {
                path: source.clone(),
                message: e.to_string(),
            })?;

        let kind = match header.kind.as_str() {
            "Deployment" => ManifestKind::Deployment,
            SERVICE_ACCOUNT => ManifestKind::ServiceAccount,
            ROLE => ManifestKind::Role,
            "RoleBinding" => ManifestKind::RoleBinding(Binding::from_value(
                &value,
                &header.kind,
                &header.metadata.name,
            )),
            "ClusterRoleBinding" => ManifestKind::ClusterRoleBinding(Binding::from_value(
                &value,
                &header.kind,
                &header.metadata.name,
            )),
            _ => ManifestKind::Other(header.kind),
        };

        Ok(Self {
            kind,
            metadata: header.metadata,
            source,
            value,
        })
    }

    /// Parses a manifest from a YAML string.
    pub fn parse(content: &str, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| SyncSetError::ParseYaml {
                path: source.clone(),
                message: e.to_string(),
            })?;
        Self::from_value(value, source)
    }

    pub fn kind(&self) -> &ManifestKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    /// The file this document was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the binding fields for RoleBindings and ClusterRoleBindings.
    pub fn binding(&self) -> Option<&Binding> {
        match &self.kind {
            ManifestKind::RoleBinding(b) | ManifestKind::ClusterRoleBinding(b) => Some(b),
            _ => None,
        }
    }

    /// Returns true if the document has a top-level `patch` key.
    pub fn has_patch(&self) -> bool {
        self.value
            .as_mapping()
            .map(|m| m.contains_key(PATCH_KEY))
            .unwrap_or(false)
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
