use crate::analyzer::report::{AnalysisReport, Finding, FindingCategory, Severity};
use serde_json::json;

const ALL_CATEGORIES: [FindingCategory; 4] = [
    FindingCategory::DangerousPermissions,
    FindingCategory::AggregatedClusterRole,
    FindingCategory::ClusterAdminPod,
    FindingCategory::NamespacedClusterRoleBinding,
];

/// Generate a SARIF 2.1.0 log from an analysis report.
/// Consumed by GitHub Code Scanning and most SARIF viewers.
pub fn to_sarif(report: &AnalysisReport) -> serde_json::Value {
    let rules: Vec<serde_json::Value> = ALL_CATEGORIES.iter().map(sarif_rule).collect();

    let results: Vec<serde_json::Value> = report.findings.iter().map(sarif_result).collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "rbac-chain",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": results,
            "invocations": [{
                "executionSuccessful": true,
                "toolExecutionNotifications": [],
            }]
        }]
    })
}

fn level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn sarif_rule(category: &FindingCategory) -> serde_json::Value {
    json!({
        "id": category.rule_id(),
        "name": category.label(),
        "shortDescription": {
            "text": category.label(),
        },
    })
}

fn sarif_result(finding: &Finding) -> serde_json::Value {
    let mut result = json!({
        "ruleId": finding.category.rule_id(),
        "level": level(finding.severity),
        "message": {
            "text": format!("{}: {}\n\nRemediation: {}", finding.title, finding.description, finding.remediation),
        },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": {
                    "uri": finding.file,
                },
                "region": {
                    "startLine": 1,
                }
            }
        }],
        "properties": {
            "severity": finding.severity.symbol(),
            "title": finding.title,
        }
    });

    // Stable identity for baseline matching on the consumer side
    result["partialFingerprints"] = json!({
        "titleFile/v1": format!("{}|{}", finding.title, finding.file),
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer;
    use crate::manifest::loader::load_content;
    use crate::manifest::ManifestSet;

    #[test]
    fn test_sarif_output_is_valid() {
        let yaml = r#"
kind: ClusterRole
metadata:
  name: god
rules:
  - apiGroups: ["*"]
    resources: ["*"]
    verbs: ["*"]
---
kind: ClusterRoleBinding
metadata:
  name: god-binding
roleRef:
  kind: ClusterRole
  name: god
subjects:
  - kind: ServiceAccount
    name: ops
    namespace: kube-system
"#;
        let mut set = ManifestSet::default();
        load_content(&mut set, yaml, "god.yaml");
        let report = analyzer::analyze(".", &set);
        let sarif = to_sarif(&report);

        assert_eq!(sarif["version"], "2.1.0");
        let runs = sarif["runs"].as_array().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0]["tool"]["driver"]["name"], "rbac-chain");
        let results = runs[0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[0]["ruleId"], "RBAC001");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "god.yaml"
        );
    }
}
