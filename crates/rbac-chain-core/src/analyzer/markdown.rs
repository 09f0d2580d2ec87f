use super::report::{AnalysisReport, Finding, Severity};
use super::scenarios;

/// Rendering switches for the markdown report.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownOptions {
    pub fail_on: Severity,
    /// Include confidential attack-scenario prose. Never on by default.
    pub include_attack_scenarios: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            fail_on: Severity::Critical,
            include_attack_scenarios: false,
        }
    }
}

/// Render the full markdown report.
pub fn render(report: &AnalysisReport, options: &MarkdownOptions) -> String {
    let mut lines = Vec::new();

    lines.push("# RBAC Privilege Chain Analysis".to_string());
    lines.push(String::new());
    lines.push(format!("Scanning repository: {}", report.root));
    lines.push(format!("Fail threshold: {}+", options.fail_on));
    lines.push(String::new());

    render_resources(report, &mut lines);
    render_dangerous(report, &mut lines);
    render_aggregated(report, &mut lines);
    render_chains(report, &mut lines);
    render_summary(report, options, &mut lines);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_resources(report: &AnalysisReport, lines: &mut Vec<String>) {
    let r = &report.resources;
    lines.push("Loaded Resources:".to_string());
    lines.push(format!("  - ClusterRoles: {}", r.cluster_roles));
    lines.push(format!("  - Roles: {}", r.roles));
    lines.push(format!("  - ClusterRoleBindings: {}", r.cluster_role_bindings));
    lines.push(format!("  - RoleBindings: {}", r.role_bindings));
    lines.push(format!("  - ServiceAccounts: {}", r.service_accounts));
    lines.push(format!("  - Pods: {}", r.pods));
    lines.push(String::new());
}

fn render_dangerous(report: &AnalysisReport, lines: &mut Vec<String>) {
    lines.push("### Dangerous Permission Analysis".to_string());
    lines.push(String::new());

    if report.dangerous_roles.is_empty() {
        lines.push("No dangerous ClusterRole permissions detected.".to_string());
        lines.push(String::new());
        return;
    }

    for role in &report.dangerous_roles {
        lines.push(format!("**ClusterRole**: `{}` ({})", role.name, role.file));
        lines.push(format!("  - Scope: {} -> {}", role.scope.describe(), role.severity));
        for issue in &role.issues {
            lines.push(format!("  - ⚠️  {}", issue));
        }
        lines.push(String::new());
    }
}

fn render_aggregated(report: &AnalysisReport, lines: &mut Vec<String>) {
    lines.push("### Aggregated ClusterRole Analysis".to_string());
    lines.push(String::new());

    if report.aggregated_roles.is_empty() {
        lines.push("No aggregated ClusterRoles detected.".to_string());
        lines.push(String::new());
        return;
    }

    for role in &report.aggregated_roles {
        lines.push(format!("**ClusterRole**: `{}`", role.name));
        lines.push(format!(
            "  - Aggregates roles matching: `[{}]`",
            role.selectors.join(", ")
        ));
        lines.push(format!("  - File: {}", role.file));
        lines.push(String::new());
    }
}

fn render_chains(report: &AnalysisReport, lines: &mut Vec<String>) {
    lines.push("### RBAC Privilege Chain Analysis".to_string());
    lines.push(String::new());
    lines.push("#### Service Account → Pod Mapping".to_string());
    lines.push(String::new());

    if report.chains.is_empty() {
        lines.push(
            "No privilege chains found: no Pod runs as a ServiceAccount with RBAC bindings."
                .to_string(),
        );
        lines.push(String::new());
        return;
    }

    for chain in &report.chains {
        lines.push(format!("**Pod**: `{}`", chain.pod));
        lines.push(format!("  - **ServiceAccount**: `{}`", chain.service_account));
        if !chain.automount_token {
            lines.push("  - Token automount disabled".to_string());
        }
        lines.push("  - **Permissions**:".to_string());
        for grant in &chain.grants {
            lines.push(format!(
                "    - {}: `{}` (via {})",
                grant.role_kind.label(),
                grant.role_name,
                grant.binding_name
            ));
        }
        lines.push(String::new());
    }
}

fn render_summary(report: &AnalysisReport, options: &MarkdownOptions, lines: &mut Vec<String>) {
    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("## RBAC SECURITY FINDINGS SUMMARY".to_string());
    lines.push(String::new());
    lines.push("---".to_string());

    if report.findings.is_empty() {
        lines.push(String::new());
        lines.push("No RBAC issues detected.".to_string());
    }

    for severity in Severity::DESCENDING {
        let findings = report.findings_with(severity);
        if findings.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("### {} ({} findings)", severity, findings.len()));
        lines.push(String::new());
        for (i, finding) in findings.iter().enumerate() {
            render_finding(i + 1, finding, options, lines);
        }
    }

    lines.push(String::new());
    lines.push(format!("**Total Findings**: {}", report.findings.len()));
    if !report.suppressed.is_empty() {
        lines.push(format!(
            "**Suppressed by baseline**: {}",
            report.suppressed.len()
        ));
    }
    lines.push(String::new());

    let blocking = report.blocking(options.fail_on);
    if blocking.is_empty() {
        lines.push(format!("✅ No {}+ RBAC issues detected", options.fail_on));
    } else {
        lines.push(format!(
            "❌ {} {}+ issues found (fail threshold: {})",
            blocking.len(),
            options.fail_on,
            options.fail_on
        ));
    }
}

fn render_finding(index: usize, finding: &Finding, options: &MarkdownOptions, lines: &mut Vec<String>) {
    lines.push(format!("{}. **{}**", index, finding.title));
    lines.push(format!("   - File: `{}`", finding.file));
    lines.push(format!("   - Issue: {}", finding.description));
    lines.push(format!("   - Fix: {}", finding.remediation));
    lines.push(String::new());

    if !options.include_attack_scenarios {
        return;
    }

    let known: Vec<_> = finding
        .attack_scenarios
        .iter()
        .filter_map(|key| scenarios::lookup(key))
        .collect();
    if known.is_empty() {
        return;
    }

    lines.push("   **Attack Scenarios (CONFIDENTIAL)**".to_string());
    for scenario in known {
        lines.push(String::new());
        lines.push(format!("   - {} (`{}`)", scenario.title, scenario.key));
        lines.push("     - Attack chain:".to_string());
        for (step, text) in scenario.attack_chain.iter().enumerate() {
            lines.push(format!("       {}) {}", step + 1, text));
        }
        lines.push("     - Detection:".to_string());
        for signal in scenario.detection {
            lines.push(format!("       - {}", signal));
        }
        lines.push(format!("     - Remediation: {}", scenario.remediation));
    }
    lines.push(String::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::report::FindingCategory;
    use crate::manifest::ResourceCounts;

    fn report_with(findings: Vec<Finding>) -> AnalysisReport {
        AnalysisReport {
            root: "repo".into(),
            resources: ResourceCounts::default(),
            dangerous_roles: Vec::new(),
            aggregated_roles: Vec::new(),
            chains: Vec::new(),
            findings,
            suppressed: Vec::new(),
        }
    }

    fn wildcard_finding() -> Finding {
        Finding {
            severity: Severity::Critical,
            category: FindingCategory::DangerousPermissions,
            title: "ClusterRole god has dangerous permissions".into(),
            description: "Wildcard resources (*)".into(),
            file: "god.yaml".into(),
            remediation: "Scope it down".into(),
            attack_scenarios: vec!["wildcard_resources".into()],
        }
    }

    #[test]
    fn test_clean_report_says_so() {
        let out = render(&report_with(Vec::new()), &MarkdownOptions::default());
        assert!(out.contains("No dangerous ClusterRole permissions detected."));
        assert!(out.contains("No aggregated ClusterRoles detected."));
        assert!(out.contains("No privilege chains found"));
        assert!(out.contains("No RBAC issues detected."));
        assert!(out.contains("✅ No CRITICAL+ RBAC issues detected"));
    }

    #[test]
    fn test_finding_block_format() {
        let out = render(&report_with(vec![wildcard_finding()]), &MarkdownOptions::default());
        assert!(out.contains("### CRITICAL (1 findings)"));
        assert!(out.contains(
            "1. **ClusterRole god has dangerous permissions**\n   - File: `god.yaml`\n   - Issue: Wildcard resources (*)\n   - Fix: Scope it down\n"
        ));
        assert!(out.contains("❌ 1 CRITICAL+ issues found (fail threshold: CRITICAL)"));
    }

    #[test]
    fn test_attack_scenarios_only_in_private_mode() {
        let report = report_with(vec![wildcard_finding()]);
        let public = render(&report, &MarkdownOptions::default());
        assert!(!public.contains("Attack Scenarios"));
        assert!(!public.contains("Wildcard resource access"));

        let private = render(
            &report,
            &MarkdownOptions {
                include_attack_scenarios: true,
                ..Default::default()
            },
        );
        assert!(private.contains("Attack Scenarios (CONFIDENTIAL)"));
        assert!(private.contains("Wildcard resource access"));
    }
}
