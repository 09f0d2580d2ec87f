use crate::manifest::{
    namespaced_key, Binding, BindingKind, ManifestSet, RoleKind, SubjectKind, DEFAULT_NAMESPACE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One role granted to a ServiceAccount by one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaGrant {
    pub role_kind: RoleKind,
    pub role_name: String,
    pub binding_name: String,
    pub binding_kind: BindingKind,
    pub source_file: String,
}

impl SaGrant {
    /// A RoleBinding that hands out a ClusterRole's rules inside one namespace.
    pub fn is_namespaced_cluster_role(&self) -> bool {
        self.binding_kind == BindingKind::RoleBinding && self.role_kind == RoleKind::ClusterRole
    }
}

/// Where a ClusterRole's permissions are actually granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingScope {
    /// Bound by at least one ClusterRoleBinding.
    pub cluster_wide: bool,
    /// Bound by at least one RoleBinding with `roleRef.kind: ClusterRole`.
    pub namespace_scoped: bool,
    /// Bound by nothing.
    pub unbound: bool,
    pub service_account_subjects: usize,
    pub group_subjects: usize,
    pub user_subjects: usize,
}

impl BindingScope {
    /// Only Groups receive the role.
    pub fn is_group_only(&self) -> bool {
        self.group_subjects > 0 && self.service_account_subjects == 0 && self.user_subjects == 0
    }

    /// Short human description of the scope, used in finding descriptions.
    pub fn describe(&self) -> String {
        let subjects = format!(
            "{} ServiceAccount, {} Group, {} User subjects",
            self.service_account_subjects, self.group_subjects, self.user_subjects
        );
        if self.unbound {
            "Not bound to any subject (dormant template)".to_string()
        } else if self.cluster_wide && self.namespace_scoped {
            format!("Bound cluster-wide via ClusterRoleBinding and in namespace scope via RoleBinding ({})", subjects)
        } else if self.cluster_wide {
            format!("Bound cluster-wide via ClusterRoleBinding ({})", subjects)
        } else {
            format!("Bound in namespace scope via RoleBinding ({})", subjects)
        }
    }
}

/// Bindings resolved against the ServiceAccounts they grant roles to.
#[derive(Debug)]
pub struct Relationships<'a> {
    manifests: &'a ManifestSet,
    grants: BTreeMap<String, Vec<SaGrant>>,
}

impl<'a> Relationships<'a> {
    /// Resolve every (binding, ServiceAccount subject) pair.
    pub fn build(manifests: &'a ManifestSet) -> Self {
        let mut grants: BTreeMap<String, Vec<SaGrant>> = BTreeMap::new();

        for binding in manifests.bindings() {
            let default_namespace = match binding.kind {
                BindingKind::ClusterRoleBinding => DEFAULT_NAMESPACE,
                BindingKind::RoleBinding => binding.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
            };

            for subject in &binding.subjects {
                if subject.kind != SubjectKind::ServiceAccount {
                    continue;
                }
                let Some(name) = subject.name.as_deref() else {
                    tracing::debug!(binding = %binding.name, "Skipping ServiceAccount subject without a name");
                    continue;
                };
                let namespace = subject.namespace.as_deref().unwrap_or(default_namespace);

                grants
                    .entry(namespaced_key(namespace, name))
                    .or_default()
                    .push(grant_from(binding));
            }
        }

        Self { manifests, grants }
    }

    pub fn manifests(&self) -> &'a ManifestSet {
        self.manifests
    }

    /// Grants for a `namespace/name` ServiceAccount key.
    pub fn grants_for(&self, service_account: &str) -> Option<&[SaGrant]> {
        self.grants.get(service_account).map(Vec::as_slice)
    }

    /// Where `cluster_role` is bound. Scans all bindings on every call.
    pub fn binding_scope(&self, cluster_role: &str) -> BindingScope {
        let mut scope = BindingScope::default();

        for binding in self.manifests.bindings() {
            let references = match binding.kind {
                BindingKind::ClusterRoleBinding => binding.role_ref.name == cluster_role,
                BindingKind::RoleBinding => {
                    binding.role_ref.kind == RoleKind::ClusterRole
                        && binding.role_ref.name == cluster_role
                }
            };
            if !references {
                continue;
            }

            match binding.kind {
                BindingKind::ClusterRoleBinding => scope.cluster_wide = true,
                BindingKind::RoleBinding => scope.namespace_scoped = true,
            }

            for subject in &binding.subjects {
                match subject.kind {
                    SubjectKind::ServiceAccount => scope.service_account_subjects += 1,
                    SubjectKind::Group => scope.group_subjects += 1,
                    SubjectKind::User => scope.user_subjects += 1,
                    SubjectKind::Other(_) => {}
                }
            }
        }

        scope.unbound = !scope.cluster_wide && !scope.namespace_scoped;
        scope
    }
}

fn grant_from(binding: &Binding) -> SaGrant {
    SaGrant {
        role_kind: binding.role_ref.kind,
        role_name: binding.role_ref.name.clone(),
        binding_name: binding.name.clone(),
        binding_kind: binding.kind,
        source_file: binding.source_file.clone(),
    }
}
