pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace assumed when a manifest omits `metadata.namespace`.
pub const DEFAULT_NAMESPACE: &str = "default";

/// ServiceAccount a Pod runs as when `spec.serviceAccountName` is absent.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Build the `namespace/name` key used for every namespaced resource.
pub fn namespaced_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// A single `rules[]` entry of a Role or ClusterRole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub resources: Vec<String>,
    pub verbs: Vec<String>,
}

/// One `clusterRoleSelectors[]` entry of an aggregation rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub match_labels: BTreeMap<String, String>,
    /// Rendered `key operator [values]` expressions.
    pub match_expressions: Vec<String>,
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        parts.extend(self.match_expressions.iter().cloned());
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRole {
    pub name: String,
    pub rules: Vec<PolicyRule>,
    /// `Some` when the document carries an `aggregationRule`, even an empty one.
    pub aggregation_selectors: Option<Vec<LabelSelector>>,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub namespace: String,
    pub name: String,
    pub rules: Vec<PolicyRule>,
    pub source_file: String,
}

impl Role {
    pub fn key(&self) -> String {
        namespaced_key(&self.namespace, &self.name)
    }
}

/// Which binding object a record was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    ClusterRoleBinding,
    RoleBinding,
}

impl BindingKind {
    pub fn label(&self) -> &str {
        match self {
            BindingKind::ClusterRoleBinding => "ClusterRoleBinding",
            BindingKind::RoleBinding => "RoleBinding",
        }
    }
}

/// The kind a `roleRef` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Role,
    ClusterRole,
}

impl RoleKind {
    pub fn label(&self) -> &str {
        match self {
            RoleKind::Role => "Role",
            RoleKind::ClusterRole => "ClusterRole",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub kind: RoleKind,
    pub name: String,
}

/// Kind of identity a binding subject names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    ServiceAccount,
    User,
    Group,
    Other(String),
}

impl SubjectKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "ServiceAccount" => SubjectKind::ServiceAccount,
            "User" => SubjectKind::User,
            "Group" => SubjectKind::Group,
            other => SubjectKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

/// A ClusterRoleBinding or RoleBinding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    pub kind: BindingKind,
    pub name: String,
    /// Only meaningful for RoleBindings; `None` when the manifest omits it.
    pub namespace: Option<String>,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub namespace: String,
    pub name: String,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    pub service_account: String,
    pub automount_token: bool,
    pub source_file: String,
}

impl Pod {
    pub fn key(&self) -> String {
        namespaced_key(&self.namespace, &self.name)
    }

    pub fn service_account_key(&self) -> String {
        namespaced_key(&self.namespace, &self.service_account)
    }
}

/// Every RBAC-relevant resource found under a scan root.
///
/// Produced once by the loader and only read afterwards.
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub cluster_roles: BTreeMap<String, ClusterRole>,
    /// Keyed by `namespace/name`.
    pub roles: BTreeMap<String, Role>,
    pub cluster_role_bindings: Vec<Binding>,
    pub role_bindings: Vec<Binding>,
    /// Keyed by `namespace/name`.
    pub service_accounts: BTreeMap<String, ServiceAccount>,
    /// Keyed by `namespace/name`.
    pub pods: BTreeMap<String, Pod>,
}

/// Number of loaded resources per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub cluster_roles: usize,
    pub roles: usize,
    pub cluster_role_bindings: usize,
    pub role_bindings: usize,
    pub service_accounts: usize,
    pub pods: usize,
}

impl ManifestSet {
    pub fn counts(&self) -> ResourceCounts {
        ResourceCounts {
            cluster_roles: self.cluster_roles.len(),
            roles: self.roles.len(),
            cluster_role_bindings: self.cluster_role_bindings.len(),
            role_bindings: self.role_bindings.len(),
            service_accounts: self.service_accounts.len(),
            pods: self.pods.len(),
        }
    }

    /// All bindings, ClusterRoleBindings first.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.cluster_role_bindings
            .iter()
            .chain(self.role_bindings.iter())
    }
}
