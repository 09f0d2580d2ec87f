use super::report::{ChainEntry, Finding, FindingCategory, Severity};
use crate::relationships::Relationships;
use std::collections::HashSet;

/// Role name that grants unrestricted access to the cluster.
pub const CLUSTER_ADMIN: &str = "cluster-admin";

/// Walk Pod -> ServiceAccount -> binding chains.
///
/// An empty chain list means no Pod runs as a ServiceAccount that any binding
/// grants a role to.
pub fn analyze_privilege_chains(relationships: &Relationships<'_>) -> (Vec<ChainEntry>, Vec<Finding>) {
    let mut chains = Vec::new();
    let mut findings = Vec::new();
    let mut reported_bindings: HashSet<String> = HashSet::new();

    for (pod_key, pod) in &relationships.manifests().pods {
        let sa_key = pod.service_account_key();
        let Some(grants) = relationships.grants_for(&sa_key) else {
            continue;
        };

        for grant in grants {
            if grant.role_name == CLUSTER_ADMIN {
                findings.push(Finding {
                    severity: Severity::Critical,
                    category: FindingCategory::ClusterAdminPod,
                    title: format!("Pod {} has cluster-admin access", pod_key),
                    description: format!(
                        "Pod uses ServiceAccount {} bound to cluster-admin via {} {}",
                        sa_key,
                        grant.binding_kind.label(),
                        grant.binding_name
                    ),
                    file: pod.source_file.clone(),
                    remediation: "Create a custom Role with minimal required permissions"
                        .to_string(),
                    attack_scenarios: Vec::new(),
                });
            }

            if grant.is_namespaced_cluster_role()
                && reported_bindings.insert(grant.binding_name.clone())
            {
                findings.push(Finding {
                    severity: Severity::Warning,
                    category: FindingCategory::NamespacedClusterRoleBinding,
                    title: format!(
                        "RoleBinding {} grants cluster-wide permissions",
                        grant.binding_name
                    ),
                    description: format!(
                        "RoleBinding references ClusterRole {}, granting cluster-scoped permissions in namespace scope",
                        grant.role_name
                    ),
                    file: grant.source_file.clone(),
                    remediation: "Use a namespace-scoped Role instead of ClusterRole".to_string(),
                    attack_scenarios: Vec::new(),
                });
            }
        }

        chains.push(ChainEntry {
            pod: pod_key.clone(),
            service_account: sa_key,
            file: pod.source_file.clone(),
            automount_token: pod.automount_token,
            grants: grants.to_vec(),
        });
    }

    (chains, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{
        Binding, BindingKind, ManifestSet, Pod, RoleKind, RoleRef, Subject, SubjectKind,
    };

    fn pod(namespace: &str, name: &str, sa: &str) -> Pod {
        Pod {
            namespace: namespace.into(),
            name: name.into(),
            service_account: sa.into(),
            automount_token: true,
            source_file: format!("{}.yaml", name),
        }
    }

    fn sa_binding(
        kind: BindingKind,
        name: &str,
        namespace: Option<&str>,
        role_kind: RoleKind,
        role: &str,
        subjects: &[(&str, Option<&str>)],
    ) -> Binding {
        Binding {
            kind,
            name: name.into(),
            namespace: namespace.map(String::from),
            role_ref: RoleRef {
                kind: role_kind,
                name: role.into(),
            },
            subjects: subjects
                .iter()
                .map(|(n, ns)| Subject {
                    kind: SubjectKind::ServiceAccount,
                    name: Some(n.to_string()),
                    namespace: ns.map(String::from),
                })
                .collect(),
            source_file: format!("{}.yaml", name),
        }
    }

    #[test]
    fn test_cluster_admin_pod_is_critical() {
        let mut set = ManifestSet::default();
        set.pods.insert("prod/api".into(), pod("prod", "api", "admin-sa"));
        set.cluster_role_bindings.push(sa_binding(
            BindingKind::ClusterRoleBinding,
            "admin-binding",
            None,
            RoleKind::ClusterRole,
            CLUSTER_ADMIN,
            &[("admin-sa", Some("prod"))],
        ));

        let rel = Relationships::build(&set);
        let (chains, findings) = analyze_privilege_chains(&rel);
        assert_eq!(chains.len(), 1);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].title.contains("prod/api"));
        assert!(findings[0].title.contains("cluster-admin"));
    }

    #[test]
    fn test_role_binding_to_cluster_role_warned_once() {
        let mut set = ManifestSet::default();
        set.pods.insert("dev/a".into(), pod("dev", "a", "builder"));
        set.pods.insert("dev/b".into(), pod("dev", "b", "deployer"));
        set.role_bindings.push(sa_binding(
            BindingKind::RoleBinding,
            "dev-edit",
            Some("dev"),
            RoleKind::ClusterRole,
            "edit",
            &[("builder", None), ("deployer", None)],
        ));

        let rel = Relationships::build(&set);
        let (chains, findings) = analyze_privilege_chains(&rel);
        assert_eq!(chains.len(), 2);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].file, "dev-edit.yaml");
    }

    #[test]
    fn test_cluster_role_binding_is_not_namespace_warning() {
        let mut set = ManifestSet::default();
        set.pods.insert("default/a".into(), pod("default", "a", "default"));
        set.cluster_role_bindings.push(sa_binding(
            BindingKind::ClusterRoleBinding,
            "view-all",
            None,
            RoleKind::ClusterRole,
            "view",
            &[("default", None)],
        ));
        let rel = Relationships::build(&set);
        let (chains, findings) = analyze_privilege_chains(&rel);
        assert_eq!(chains.len(), 1);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_no_chains_when_service_account_unbound() {
        let mut set = ManifestSet::default();
        set.pods.insert("prod/api".into(), pod("prod", "api", "lonely"));
        let rel = Relationships::build(&set);
        let (chains, findings) = analyze_privilege_chains(&rel);
        assert!(chains.is_empty());
        assert!(findings.is_empty());
    }
}
