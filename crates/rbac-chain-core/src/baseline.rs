use crate::analyzer::report::Finding;
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Section of the shared security baseline that holds RBAC acknowledgments.
pub const BASELINE_SECTION: &str = "rbac-analyzer";

/// Locations searched under the scan root, in order.
pub const DEFAULT_BASELINE_PATHS: &[&str] = &[
    ".github/config/security-baseline.yaml",
    ".security-baseline.json",
];

/// One previously reviewed finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BaselineFile {
    #[serde(rename = "rbac-analyzer", default)]
    rbac_analyzer: Option<Vec<BaselineEntry>>,
}

/// Acknowledged findings, matched by `(title, file)`.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub entries: Vec<BaselineEntry>,
    pub source: Option<PathBuf>,
}

impl Baseline {
    /// Parse baseline content. JSON when `json` is set, YAML otherwise.
    pub fn parse(content: &str, json: bool) -> Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: Option<BaselineFile> = if json {
            serde_json::from_str(content).map_err(|e| e.to_string())?
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())?
        };
        let entries = file
            .and_then(|f| f.rbac_analyzer)
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !e.title.is_empty())
            .collect();
        Ok(Self {
            entries,
            source: None,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScanError::BaselineRead {
            path: path.to_path_buf(),
            source,
        })?;
        let json = path.extension().is_some_and(|ext| ext == "json");
        let mut baseline = Self::parse(&content, json).map_err(|message| ScanError::BaselineParse {
            path: path.to_path_buf(),
            message,
        })?;
        baseline.source = Some(path.to_path_buf());
        tracing::info!(path = %path.display(), entries = baseline.entries.len(), "Loaded baseline");
        Ok(baseline)
    }

    /// Load the first default baseline that exists under `root`.
    pub fn discover(root: &Path) -> Result<Option<Self>, ScanError> {
        for candidate in DEFAULT_BASELINE_PATHS {
            let path = root.join(candidate);
            if path.is_file() {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    pub fn is_acknowledged(&self, finding: &Finding) -> bool {
        self.entries
            .iter()
            .any(|e| e.title == finding.title && e.file == finding.file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::report::{FindingCategory, Severity};
    use std::fs;

    fn finding(title: &str, file: &str) -> Finding {
        Finding {
            severity: Severity::High,
            category: FindingCategory::DangerousPermissions,
            title: title.into(),
            description: String::new(),
            file: file.into(),
            remediation: String::new(),
            attack_scenarios: Vec::new(),
        }
    }

    #[test]
    fn test_parse_yaml_baseline_ignores_other_tools() {
        let baseline = Baseline::parse(
            r#"
version: "2.0"
gitleaks:
  - file: app.env
    line: 3
rbac-analyzer:
  - title: ClusterRole ops has dangerous permissions
    file: manifests/ops.yaml
    reason: Break-glass role reviewed by the platform team
    acknowledged_by: platform
    acknowledged_date: "2025-11-02"
"#,
            false,
        )
        .unwrap();
        assert_eq!(baseline.len(), 1);
        assert!(baseline.is_acknowledged(&finding(
            "ClusterRole ops has dangerous permissions",
            "manifests/ops.yaml"
        )));
        assert!(!baseline.is_acknowledged(&finding(
            "ClusterRole ops has dangerous permissions",
            "other/ops.yaml"
        )));
    }

    #[test]
    fn test_parse_json_baseline() {
        let baseline = Baseline::parse(
            r#"{"rbac-analyzer": [{"title": "Pod prod/api has cluster-admin access", "file": "api.yaml"}]}"#,
            true,
        )
        .unwrap();
        assert!(baseline.is_acknowledged(&finding("Pod prod/api has cluster-admin access", "api.yaml")));
    }

    #[test]
    fn test_empty_and_null_baselines() {
        assert!(Baseline::parse("", false).unwrap().is_empty());
        assert!(Baseline::parse("~\n", false).unwrap().is_empty());
        assert!(Baseline::parse("rbac-analyzer:\n", false).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_baseline_is_error() {
        assert!(Baseline::parse("rbac-analyzer: [unclosed", false).is_err());
    }

    #[test]
    fn test_discover_prefers_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".github/config")).unwrap();
        fs::write(
            tmp.path().join(".github/config/security-baseline.yaml"),
            "rbac-analyzer:\n  - title: a\n    file: b\n",
        )
        .unwrap();
        fs::write(tmp.path().join(".security-baseline.json"), "{}").unwrap();

        let baseline = Baseline::discover(tmp.path()).unwrap().unwrap();
        assert_eq!(baseline.len(), 1);
        assert!(baseline
            .source
            .unwrap()
            .ends_with(".github/config/security-baseline.yaml"));
    }

    #[test]
    fn test_discover_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Baseline::discover(tmp.path()).unwrap().is_none());
    }
}
