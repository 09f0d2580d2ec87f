use super::policy::assess_rules;
use super::report::{Finding, FindingCategory, RoleAssessment, Severity};
use crate::relationships::{BindingScope, Relationships};

const LEAST_PRIVILEGE: &str =
    "Apply principle of least privilege - specify exact resources and verbs needed";

/// Severity of a dangerous ClusterRole given where it is bound.
///
/// Precedence: unbound, cluster-wide, namespace-scoped.
pub fn severity_for_scope(scope: &BindingScope, has_wildcard: bool) -> Severity {
    if scope.unbound {
        Severity::Info
    } else if scope.cluster_wide && has_wildcard {
        Severity::Critical
    } else if scope.cluster_wide {
        Severity::High
    } else if has_wildcard {
        Severity::High
    } else {
        Severity::Warning
    }
}

fn remediation_for(scope: &BindingScope, severity: Severity) -> String {
    match severity {
        Severity::Info => format!(
            "{}; remove the ClusterRole if unused, or tighten it before anything binds it",
            LEAST_PRIVILEGE
        ),
        Severity::Critical => format!(
            "{}; replace wildcards and avoid granting this role through a ClusterRoleBinding",
            LEAST_PRIVILEGE
        ),
        Severity::High if scope.cluster_wide => format!(
            "{}; prefer a namespace-scoped RoleBinding over a ClusterRoleBinding",
            LEAST_PRIVILEGE
        ),
        Severity::High => format!("{}; replace wildcards with explicit lists", LEAST_PRIVILEGE),
        Severity::Warning if scope.is_group_only() => format!(
            "{}; review Group membership, since every member receives these permissions in the bound namespaces",
            LEAST_PRIVILEGE
        ),
        Severity::Warning => format!(
            "{}; consider a namespace-scoped Role for the bound ServiceAccounts",
            LEAST_PRIVILEGE
        ),
    }
}

/// Evaluate every ClusterRole's rules. One consolidated finding per role.
pub fn analyze_dangerous_permissions(
    relationships: &Relationships<'_>,
) -> (Vec<RoleAssessment>, Vec<Finding>) {
    let mut assessments = Vec::new();
    let mut findings = Vec::new();

    for (name, role) in &relationships.manifests().cluster_roles {
        let assessment = assess_rules(&role.rules);
        if assessment.is_empty() {
            continue;
        }

        let scope = relationships.binding_scope(name);
        let severity = severity_for_scope(&scope, assessment.has_wildcard());
        let issues = assessment.issues();

        findings.push(Finding {
            severity,
            category: FindingCategory::DangerousPermissions,
            title: format!("ClusterRole {} has dangerous permissions", name),
            description: format!("{}. {}", issues.join("; "), scope.describe()),
            file: role.source_file.clone(),
            remediation: remediation_for(&scope, severity),
            attack_scenarios: assessment
                .scenario_keys()
                .into_iter()
                .map(String::from)
                .collect(),
        });

        assessments.push(RoleAssessment {
            name: name.clone(),
            file: role.source_file.clone(),
            issues,
            scope,
            severity,
        });
    }

    (assessments, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{
        Binding, BindingKind, ClusterRole, ManifestSet, PolicyRule, RoleKind, RoleRef, Subject,
        SubjectKind,
    };

    fn scope(cluster_wide: bool, namespace_scoped: bool) -> BindingScope {
        BindingScope {
            cluster_wide,
            namespace_scoped,
            unbound: !cluster_wide && !namespace_scoped,
            service_account_subjects: 1,
            ..Default::default()
        }
    }

    fn cluster_role(name: &str, resources: &[&str], verbs: &[&str]) -> ClusterRole {
        ClusterRole {
            name: name.into(),
            rules: vec![PolicyRule {
                resources: resources.iter().map(|s| s.to_string()).collect(),
                verbs: verbs.iter().map(|s| s.to_string()).collect(),
            }],
            aggregation_selectors: None,
            source_file: format!("{}.yaml", name),
        }
    }

    fn bind(kind: BindingKind, role: &str, subject_kind: SubjectKind) -> Binding {
        Binding {
            kind,
            name: format!("{}-binding", role),
            namespace: Some("dev".into()),
            role_ref: RoleRef {
                kind: RoleKind::ClusterRole,
                name: role.into(),
            },
            subjects: vec![Subject {
                kind: subject_kind,
                name: Some("someone".into()),
                namespace: None,
            }],
            source_file: "binding.yaml".into(),
        }
    }

    #[test]
    fn test_severity_precedence() {
        assert_eq!(severity_for_scope(&scope(false, false), true), Severity::Info);
        assert_eq!(severity_for_scope(&scope(false, false), false), Severity::Info);
        assert_eq!(severity_for_scope(&scope(true, false), true), Severity::Critical);
        assert_eq!(severity_for_scope(&scope(true, true), true), Severity::Critical);
        assert_eq!(severity_for_scope(&scope(true, false), false), Severity::High);
        assert_eq!(severity_for_scope(&scope(false, true), true), Severity::High);
        assert_eq!(severity_for_scope(&scope(false, true), false), Severity::Warning);
    }

    #[test]
    fn test_unbound_wildcard_role_is_info() {
        let mut set = ManifestSet::default();
        set.cluster_roles
            .insert("god".into(), cluster_role("god", &["*"], &["*"]));
        let rel = Relationships::build(&set);
        let (assessments, findings) = analyze_dangerous_permissions(&rel);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].description.contains("dormant template"));
        assert!(assessments[0].scope.unbound);
    }

    #[test]
    fn test_cluster_wide_wildcard_resource_is_critical() {
        let mut set = ManifestSet::default();
        set.cluster_roles
            .insert("reader".into(), cluster_role("reader", &["*"], &["get"]));
        set.cluster_role_bindings.push(bind(
            BindingKind::ClusterRoleBinding,
            "reader",
            SubjectKind::ServiceAccount,
        ));
        let rel = Relationships::build(&set);
        let (_, findings) = analyze_dangerous_permissions(&rel);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].title, "ClusterRole reader has dangerous permissions");
        assert_eq!(findings[0].attack_scenarios, vec!["wildcard_resources"]);
    }

    #[test]
    fn test_namespace_scoped_without_wildcards_is_warning() {
        let mut set = ManifestSet::default();
        set.cluster_roles.insert(
            "secret-reader".into(),
            cluster_role("secret-reader", &["secrets"], &["get"]),
        );
        set.role_bindings.push(bind(
            BindingKind::RoleBinding,
            "secret-reader",
            SubjectKind::Group,
        ));
        let rel = Relationships::build(&set);
        let (_, findings) = analyze_dangerous_permissions(&rel);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].remediation.contains("Group membership"));
    }

    #[test]
    fn test_group_and_service_account_remediation_differ() {
        let group = BindingScope {
            namespace_scoped: true,
            group_subjects: 2,
            ..Default::default()
        };
        let account = BindingScope {
            namespace_scoped: true,
            service_account_subjects: 1,
            ..Default::default()
        };
        assert_ne!(
            remediation_for(&group, Severity::Warning),
            remediation_for(&account, Severity::Warning)
        );
    }

    #[test]
    fn test_harmless_role_produces_nothing() {
        let mut set = ManifestSet::default();
        set.cluster_roles
            .insert("view".into(), cluster_role("view", &["pods"], &["get", "list"]));
        let rel = Relationships::build(&set);
        let (assessments, findings) = analyze_dangerous_permissions(&rel);
        assert!(assessments.is_empty());
        assert!(findings.is_empty());
    }
}
