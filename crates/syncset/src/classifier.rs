//! Classification of a directory's manifests into patches and resources.
//!
//! A directory usually holds one operator: its Deployment, its ServiceAccount
//! and the RBAC granted to that ServiceAccount. Those are installed through
//! the operator's CSV, so they are left out of the SelectorSyncSet. Everything
//! else ends up either in `spec.patches` (documents with a `patch` key) or in
//! `spec.resources`.

use std::collections::HashSet;

use log::{debug, warn};
use serde_yaml::Value;

use crate::manifest::{Manifest, ManifestKind, ROLE};

/// Substring of a `roleRef.name` that marks a binding as CSV-managed.
pub const DEDICATED_ADMIN: &str = "dedicated-admin";

/// Why a manifest was left out of the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Deployments are shipped by the CSV.
    Deployment,
    /// The operator's ServiceAccount.
    ServiceAccount,
    /// A Role bound to a ServiceAccount in its own namespace.
    ServiceAccountRole,
    /// A binding of the ServiceAccount to a `dedicated-admin` role.
    DedicatedAdminBinding,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Deployment => write!(f, "deployment"),
            SkipReason::ServiceAccount => write!(f, "service account"),
            SkipReason::ServiceAccountRole => write!(f, "role bound to service account"),
            SkipReason::DedicatedAdminBinding => write!(f, "dedicated-admin binding"),
        }
    }
}

/// A manifest left out of the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedManifest {
    pub kind: String,
    pub name: String,
    pub reason: SkipReason,
}

/// The outcome of classifying one directory.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Documents carrying a `patch` key, in input order.
    pub patches: Vec<Value>,
    /// All other kept documents, in input order.
    pub resources: Vec<Value>,
    /// Documents that were left out.
    pub skipped: Vec<SkippedManifest>,
}

impl Classification {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Total number of documents that went into the classification.
    pub fn total(&self) -> usize {
        self.patches.len() + self.resources.len() + self.skipped.len()
    }
}

/// Decides, for a fixed set of manifests, which ones to leave out.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    service_account: Option<String>,
    service_account_roles: HashSet<String>,
}

impl Classifier {
    /// Scans the manifests for the ServiceAccount and the Roles bound to it.
    pub fn new(manifests: &[Manifest]) -> Self {
        Self {
            service_account: find_service_account(manifests).map(str::to_string),
            service_account_roles: find_service_account_roles(manifests),
        }
    }

    /// Name of the first ServiceAccount in the set.
    pub fn service_account(&self) -> Option<&str> {
        self.service_account.as_deref()
    }

    /// Returns true if the Role is bound to a ServiceAccount in its own namespace.
    pub fn is_service_account_role(&self, name: &str) -> bool {
        self.service_account_roles.contains(name)
    }

    /// Returns why the manifest should be left out, or `None` to keep it.
    pub fn skip_reason(&self, manifest: &Manifest) -> Option<SkipReason> {
        match manifest.kind() {
            ManifestKind::Deployment => Some(SkipReason::Deployment),
            ManifestKind::ServiceAccount => Some(SkipReason::ServiceAccount),
            ManifestKind::Role if self.is_service_account_role(manifest.name()) => {
                Some(SkipReason::ServiceAccountRole)
            }
            ManifestKind::RoleBinding(binding) | ManifestKind::ClusterRoleBinding(binding) => {
                let sa = self.service_account.as_deref()?;
                let dedicated_admin = binding
                    .role_ref_name()
                    .map(|name| name.contains(DEDICATED_ADMIN))
                    .unwrap_or(false);
                let binds_sa = binding
                    .subjects
                    .iter()
                    .any(|s| s.name.as_deref() == Some(sa));

                (binds_sa && dedicated_admin).then_some(SkipReason::DedicatedAdminBinding)
            }
            _ => None,
        }
    }

    /// Splits the manifests into patches and resources, dropping skipped ones.
    pub fn classify(&self, manifests: Vec<Manifest>) -> Classification {
        let mut classification = Classification::default();

        for manifest in manifests {
            if let Some(reason) = self.skip_reason(&manifest) {
                debug!(
                    "Skipping {} '{}' ({})",
                    manifest.kind(),
                    manifest.name(),
                    reason
                );
                classification.skipped.push(SkippedManifest {
                    kind: manifest.kind().to_string(),
                    name: manifest.name().to_string(),
                    reason,
                });
                continue;
            }

            if manifest.has_patch() {
                classification.patches.push(manifest.into_value());
            } else {
                classification.resources.push(manifest.into_value());
            }
        }

        classification
    }
}

/// Classifies all manifests of one directory.
///
/// Returns `None` when there are no manifests, in which case no bundle should
/// be produced.
pub fn classify(manifests: Vec<Manifest>) -> Option<Classification> {
    if manifests.is_empty() {
        return None;
    }

    let classifier = Classifier::new(&manifests);
    Some(classifier.classify(manifests))
}

fn find_service_account(manifests: &[Manifest]) -> Option<&str> {
    manifests
        .iter()
        .find(|m| matches!(m.kind(), ManifestKind::ServiceAccount))
        .map(|m| m.name())
}

/// Collects the Roles that some RoleBinding grants to a ServiceAccount living
/// in the binding's own namespace.
fn find_service_account_roles(manifests: &[Manifest]) -> HashSet<String> {
    let mut roles = HashSet::new();

    for manifest in manifests {
        let ManifestKind::RoleBinding(binding) = manifest.kind() else {
            continue;
        };

        let namespace = manifest.namespace();
        if namespace.is_none() {
            warn!(
                "RoleBinding '{}' is missing .metadata.namespace",
                manifest.name()
            );
        }

        for subject in &binding.subjects {
            if subject.namespace.is_none() {
                warn!(
                    "RoleBinding '{}' is missing .subjects[].namespace",
                    manifest.name()
                );
            }

            let same_namespace = namespace.is_some() && subject.namespace.as_deref() == namespace;
            if binding.role_ref_kind() == Some(ROLE)
                && subject.is_service_account()
                && same_namespace
            {
                if let Some(role) = binding.role_ref_name() {
                    roles.insert(role.to_string());
                }
            }
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(yaml: &str) -> Manifest {
        Manifest::parse(yaml, "test.yaml").unwrap()
    }

    fn service_account() -> Manifest {
        manifest(
            r#"
kind: ServiceAccount
metadata:
  name: my-operator
  namespace: openshift-my-operator
"#,
        )
    }

    fn role(name: &str) -> Manifest {
        manifest(&format!(
            "kind: Role\nmetadata:\n  name: {}\n  namespace: openshift-my-operator\n",
            name
        ))
    }

    fn role_binding(role: &str, subject_ns: &str) -> Manifest {
        manifest(&format!(
            r#"
kind: RoleBinding
metadata:
  name: {role}
  namespace: openshift-my-operator
roleRef:
  kind: Role
  name: {role}
subjects:
- kind: ServiceAccount
  name: my-operator
  namespace: {subject_ns}
"#
        ))
    }

    fn cluster_role_binding(role: &str, subject: &str) -> Manifest {
        manifest(&format!(
            r#"
kind: ClusterRoleBinding
metadata:
  name: {role}-binding
roleRef:
  kind: ClusterRole
  name: {role}
subjects:
- kind: ServiceAccount
  name: {subject}
  namespace: openshift-my-operator
"#
        ))
    }

    fn names(values: &[Value]) -> Vec<&str> {
        values
            .iter()
            .map(|v| v["metadata"]["name"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(classify(Vec::new()).is_none());
    }

    #[test]
    fn test_operator_rbac_is_skipped() {
        let manifests = vec![
            service_account(),
            role("dedicated-admin-my-operator"),
            role_binding("dedicated-admin-my-operator", "openshift-my-operator"),
            manifest("kind: Deployment\nmetadata:\n  name: my-operator\n"),
        ];

        let result = classify(manifests).unwrap();
        assert!(result.resources.is_empty(), "{:?}", result.resources);
        assert!(result.patches.is_empty());
        assert_eq!(result.skipped_count(), 4);
        assert_eq!(result.total(), 4);
    }

    #[test]
    fn test_role_binding_for_plain_role_is_kept() {
        let manifests = vec![
            service_account(),
            role("my-operator"),
            role_binding("my-operator", "openshift-my-operator"),
        ];

        let result = classify(manifests).unwrap();
        // The Role is CSV-managed, its binding is only dropped for dedicated-admin roles.
        assert_eq!(names(&result.resources), vec!["my-operator"]);
        assert_eq!(result.skipped[1].reason, SkipReason::ServiceAccountRole);
    }

    #[test]
    fn test_role_bound_across_namespaces_is_kept() {
        let manifests = vec![
            service_account(),
            role("my-operator"),
            role_binding("my-operator", "openshift-other"),
        ];

        let result = classify(manifests).unwrap();
        assert_eq!(names(&result.resources), vec!["my-operator", "my-operator"]);
        assert_eq!(result.skipped_count(), 1);
    }

    #[test]
    fn test_role_binding_missing_namespace_does_not_match() {
        let binding = manifest(
            r#"
kind: RoleBinding
metadata:
  name: rb
roleRef:
  kind: Role
  name: r
subjects:
- kind: ServiceAccount
  name: my-operator
"#,
        );
        let classifier = Classifier::new(&[binding]);
        assert!(!classifier.is_service_account_role("r"));
    }

    #[test]
    fn test_role_binding_to_cluster_role_does_not_exclude_role() {
        let binding = manifest(
            r#"
kind: RoleBinding
metadata:
  name: rb
  namespace: ns
roleRef:
  kind: ClusterRole
  name: r
subjects:
- kind: ServiceAccount
  name: my-operator
  namespace: ns
"#,
        );
        let classifier = Classifier::new(&[binding]);
        assert!(!classifier.is_service_account_role("r"));
    }

    #[test]
    fn test_role_bound_to_any_same_namespace_service_account_is_excluded() {
        let binding = manifest(
            r#"
kind: RoleBinding
metadata:
  name: rb
  namespace: ns
roleRef:
  kind: Role
  name: reader
subjects:
- kind: ServiceAccount
  name: someone-else
  namespace: ns
"#,
        );
        let classifier = Classifier::new(&[binding]);
        assert!(classifier.is_service_account_role("reader"));
    }

    #[test]
    fn test_dedicated_admin_cluster_role_binding_is_skipped() {
        let manifests = vec![
            service_account(),
            cluster_role_binding("dedicated-admins-project", "my-operator"),
        ];
        let result = classify(manifests).unwrap();
        assert!(result.resources.is_empty());
        assert_eq!(
            result.skipped[1].reason,
            SkipReason::DedicatedAdminBinding
        );
    }

    #[test]
    fn test_cluster_role_binding_for_other_subject_is_kept() {
        let manifests = vec![
            service_account(),
            cluster_role_binding("dedicated-admins-project", "somebody"),
        ];
        let result = classify(manifests).unwrap();
        assert_eq!(names(&result.resources), vec!["dedicated-admins-project-binding"]);
    }

    #[test]
    fn test_cluster_role_binding_for_other_role_is_kept() {
        let manifests = vec![
            service_account(),
            cluster_role_binding("cluster-reader", "my-operator"),
        ];
        let result = classify(manifests).unwrap();
        assert_eq!(names(&result.resources), vec!["cluster-reader-binding"]);
    }

    #[test]
    fn test_malformed_subject_does_not_hide_operator_rbac() {
        let manifests = vec![
            service_account(),
            manifest(
                r#"
kind: ClusterRoleBinding
metadata:
  name: dedicated-admins-cluster
roleRef:
  kind: ClusterRole
  name: dedicated-admins-cluster
subjects:
- kind: ServiceAccount
  name: my-operator
  namespace: openshift-my-operator
- kind: Group
  name: 1234
"#,
            ),
            role("dedicated-admin-my-operator"),
            manifest(
                r#"
kind: RoleBinding
metadata:
  name: dedicated-admin-my-operator
  namespace: openshift-my-operator
roleRef:
  kind: Role
  name: dedicated-admin-my-operator
subjects:
- kind: Group
  name: [not, a, name]
- kind: ServiceAccount
  name: my-operator
  namespace: openshift-my-operator
"#,
            ),
        ];

        let result = classify(manifests).unwrap();
        assert!(result.resources.is_empty(), "{:?}", result.resources);
        assert_eq!(result.skipped_count(), 4);
        assert_eq!(
            result.skipped[1].reason,
            SkipReason::DedicatedAdminBinding
        );
        assert_eq!(result.skipped[2].reason, SkipReason::ServiceAccountRole);
    }

    #[test]
    fn test_dedicated_admin_binding_without_service_account_is_kept() {
        let manifests = vec![cluster_role_binding("dedicated-admin", "my-operator")];
        let result = classify(manifests).unwrap();
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.skipped_count(), 0);
    }

    #[test]
    fn test_patch_documents_go_to_patches() {
        let manifests = vec![
            manifest(
                r#"
kind: Role
metadata:
  name: patched
patch: '{"rules":[]}'
"#,
            ),
            manifest("kind: ConfigMap\nmetadata:\n  name: plain\n"),
        ];
        let result = classify(manifests).unwrap();
        assert_eq!(names(&result.patches), vec!["patched"]);
        assert_eq!(names(&result.resources), vec!["plain"]);
    }

    #[test]
    fn test_order_is_preserved() {
        let manifests = vec![
            manifest("kind: ConfigMap\nmetadata:\n  name: c\n"),
            manifest("kind: ConfigMap\nmetadata:\n  name: a\n"),
            manifest("kind: ConfigMap\nmetadata:\n  name: b\n"),
        ];
        let result = classify(manifests).unwrap();
        assert_eq!(names(&result.resources), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_first_service_account_wins() {
        let manifests = vec![
            service_account(),
            manifest("kind: ServiceAccount\nmetadata:\n  name: second\n"),
        ];
        let classifier = Classifier::new(&manifests);
        assert_eq!(classifier.service_account(), Some("my-operator"));
    }
}
