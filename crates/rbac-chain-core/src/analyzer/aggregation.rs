use super::report::{AggregatedRole, Finding, FindingCategory, Severity};
use crate::manifest::ManifestSet;

/// Report every ClusterRole that declares an `aggregationRule`.
pub fn check_aggregated_roles(manifests: &ManifestSet) -> (Vec<AggregatedRole>, Vec<Finding>) {
    let mut roles = Vec::new();
    let mut findings = Vec::new();

    for (name, role) in &manifests.cluster_roles {
        let Some(selectors) = &role.aggregation_selectors else {
            continue;
        };
        let rendered: Vec<String> = selectors.iter().map(ToString::to_string).collect();

        findings.push(Finding {
            severity: Severity::Info,
            category: FindingCategory::AggregatedClusterRole,
            title: format!("Aggregated ClusterRole detected: {}", name),
            description: format!(
                "Aggregates permissions from roles matching [{}]",
                rendered.join(", ")
            ),
            file: role.source_file.clone(),
            remediation:
                "Review aggregation selectors to ensure no unintended permissions are granted"
                    .to_string(),
            attack_scenarios: Vec::new(),
        });
        roles.push(AggregatedRole {
            name: name.clone(),
            selectors: rendered,
            file: role.source_file.clone(),
        });
    }

    (roles, findings)
}
