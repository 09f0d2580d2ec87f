use crate::analyzer::report::Severity;
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the scan root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = ".rbac-chain.toml";

/// Scan configuration loaded from TOML. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Minimum severity that fails the scan
    pub fail_on: Option<Severity>,

    /// Print confidential attack-scenario prose
    pub include_attack_scenarios: Option<bool>,

    /// Baseline file, relative to the scan root unless absolute
    pub baseline: Option<PathBuf>,

    /// Extra whole path segments to skip (e.g., ["charts", "hack"])
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ScanConfig {
    /// Resolve `baseline` against the scan root.
    pub fn baseline_path(&self, root: &Path) -> Option<PathBuf> {
        self.baseline.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        })
    }
}

/// Load a configuration file.
pub fn load_config(path: &Path) -> Result<ScanConfig, ScanError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScanError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ScanError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load `<root>/.rbac-chain.toml` when it exists.
pub fn discover_config(root: &Path) -> Result<Option<ScanConfig>, ScanError> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let config = load_config(&path)?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_full_config() {
        let config: ScanConfig = toml::from_str(
            r#"
fail_on = "HIGH"
include_attack_scenarios = true
baseline = "security/baseline.yaml"
exclude = ["charts", "hack"]
"#,
        )
        .unwrap();
        assert_eq!(config.fail_on, Some(Severity::High));
        assert_eq!(config.include_attack_scenarios, Some(true));
        assert_eq!(
            config.baseline_path(Path::new("/repo")),
            Some(PathBuf::from("/repo/security/baseline.yaml"))
        );
        assert_eq!(config.exclude, vec!["charts", "hack"]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: ScanConfig = toml::from_str("").unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn test_invalid_severity_rejected() {
        assert!(toml::from_str::<ScanConfig>("fail_on = \"MEDIUM\"").is_err());
    }

    #[test]
    fn test_discover_config() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_config(tmp.path()).unwrap().is_none());

        fs::write(tmp.path().join(CONFIG_FILE_NAME), "fail_on = \"WARNING\"\n").unwrap();
        let config = discover_config(tmp.path()).unwrap().unwrap();
        assert_eq!(config.fail_on, Some(Severity::Warning));

        fs::write(tmp.path().join(CONFIG_FILE_NAME), "fail_on = [").unwrap();
        assert!(matches!(
            discover_config(tmp.path()),
            Err(ScanError::ConfigParse { .. })
        ));
    }
}
