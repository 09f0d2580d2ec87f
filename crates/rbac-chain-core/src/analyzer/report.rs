use crate::baseline::Baseline;
use crate::manifest::ResourceCounts;
use crate::relationships::{BindingScope, SaGrant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a finding. Ordered so that `Info < Warning < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    /// Report section order.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Warning,
        Severity::Info,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity '{0}' (expected CRITICAL, HIGH, WARNING or INFO)")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Severity::Critical),
            "HIGH" => Ok(Severity::High),
            "WARNING" => Ok(Severity::Warning),
            "INFO" => Ok(Severity::Info),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// What produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingCategory {
    DangerousPermissions,
    AggregatedClusterRole,
    ClusterAdminPod,
    NamespacedClusterRoleBinding,
}

impl FindingCategory {
    pub fn label(&self) -> &str {
        match self {
            FindingCategory::DangerousPermissions => "Dangerous ClusterRole Permissions",
            FindingCategory::AggregatedClusterRole => "Aggregated ClusterRole",
            FindingCategory::ClusterAdminPod => "Pod With cluster-admin",
            FindingCategory::NamespacedClusterRoleBinding => "RoleBinding To ClusterRole",
        }
    }

    pub fn rule_id(&self) -> &str {
        match self {
            FindingCategory::DangerousPermissions => "RBAC001",
            FindingCategory::AggregatedClusterRole => "RBAC002",
            FindingCategory::ClusterAdminPod => "RBAC003",
            FindingCategory::NamespacedClusterRoleBinding => "RBAC004",
        }
    }
}

/// A single reportable RBAC observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    pub file: String,
    pub remediation: String,
    /// Keys into the attack-scenario catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attack_scenarios: Vec<String>,
}

/// Dangerous-permission assessment of one ClusterRole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssessment {
    pub name: String,
    pub file: String,
    pub issues: Vec<String>,
    pub scope: BindingScope,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRole {
    pub name: String,
    pub selectors: Vec<String>,
    pub file: String,
}

/// A Pod whose ServiceAccount receives roles through bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    pub pod: String,
    pub service_account: String,
    pub file: String,
    pub automount_token: bool,
    pub grants: Vec<SaGrant>,
}

/// The complete result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub root: String,
    pub resources: ResourceCounts,
    pub dangerous_roles: Vec<RoleAssessment>,
    pub aggregated_roles: Vec<AggregatedRole>,
    pub chains: Vec<ChainEntry>,
    pub findings: Vec<Finding>,
    /// Findings removed because the baseline acknowledges them.
    #[serde(default)]
    pub suppressed: Vec<Finding>,
}

impl AnalysisReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn findings_with(&self, severity: Severity) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.severity == severity).collect()
    }

    /// Findings at or above `threshold`.
    pub fn blocking(&self, threshold: Severity) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.severity >= threshold).collect()
    }

    /// `1` when any finding reaches `threshold`, else `0`.
    pub fn exit_code(&self, threshold: Severity) -> i32 {
        if self.blocking(threshold).is_empty() {
            0
        } else {
            1
        }
    }

    /// Move every finding the baseline acknowledges into `suppressed`.
    pub fn apply_baseline(&mut self, baseline: &Baseline) {
        let (suppressed, kept): (Vec<Finding>, Vec<Finding>) = std::mem::take(&mut self.findings)
            .into_iter()
            .partition(|f| baseline.is_acknowledged(f));
        self.findings = kept;
        self.suppressed.extend(suppressed);
    }

    /// JSON form of the report with the verdict for `threshold` attached.
    pub fn to_json(&self, threshold: Severity) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("fail_on".into(), serde_json::json!(threshold));
            map.insert(
                "passed".into(),
                serde_json::json!(self.exit_code(threshold) == 0),
            );
        }
        value
    }
}
