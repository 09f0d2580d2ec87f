pub mod aggregation;
pub mod chains;
pub mod dangerous;
pub mod markdown;
pub mod policy;
pub mod report;
pub mod sarif;
pub mod scenarios;

use crate::manifest::ManifestSet;
use crate::relationships::Relationships;
use report::AnalysisReport;

/// Run all RBAC checks over a loaded manifest set and produce a unified report.
pub fn analyze(root: &str, manifests: &ManifestSet) -> AnalysisReport {
    let relationships = Relationships::build(manifests);
    let mut findings = Vec::new();

    let (dangerous_roles, dangerous_findings) =
        dangerous::analyze_dangerous_permissions(&relationships);
    findings.extend(dangerous_findings);

    let (aggregated_roles, aggregated_findings) = aggregation::check_aggregated_roles(manifests);
    findings.extend(aggregated_findings);

    let (chains, chain_findings) = chains::analyze_privilege_chains(&relationships);
    findings.extend(chain_findings);

    // Stable, so discovery order survives within a severity
    findings.sort_by_key(|f| std::cmp::Reverse(f.severity));

    AnalysisReport {
        root: root.to_string(),
        resources: manifests.counts(),
        dangerous_roles,
        aggregated_roles,
        chains,
        findings,
        suppressed: Vec::new(),
    }
}
