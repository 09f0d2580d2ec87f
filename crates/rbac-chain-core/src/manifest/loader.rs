use super::*;
use crate::error::{ManifestError, ScanError};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Path segments that are never scanned. Matched against whole segments only,
/// so `rolebindings/` is scanned while `bin/` is not.
pub const EXCLUDED_SEGMENTS: &[&str] = &[
    ".git",
    "vendor",
    "node_modules",
    "test",
    "tests",
    "testdata",
    "examples",
    "docs",
    "bin",
    ".github",
];

/// Value substituted for every `{{ ... }}` span in templated manifests.
pub const TEMPLATE_PLACEHOLDER: &str = "placeholder-value";

const TEMPLATE_SUFFIXES: &[&str] = &[".tmpl.yaml", ".template.yaml"];

fn template_token() -> Option<&'static Regex> {
    static TOKEN: OnceLock<Option<Regex>> = OnceLock::new();
    TOKEN
        .get_or_init(|| Regex::new(r"\{\{[^}]+\}\}").ok())
        .as_ref()
}

/// True when a file must be treated as a Go/Helm template.
pub fn is_template(path: &str, content: &str) -> bool {
    TEMPLATE_SUFFIXES.iter().any(|s| path.contains(s)) || content.contains("{{")
}

/// Replace every `{{ ... }}` span with [`TEMPLATE_PLACEHOLDER`].
pub fn preprocess_template(content: &str) -> Cow<'_, str> {
    match template_token() {
        Some(token) => token.replace_all(content, TEMPLATE_PLACEHOLDER),
        None => Cow::Borrowed(content),
    }
}

/// `root` without `.` components. Paths returned by glob never carry them.
pub fn normalized_root(root: &Path) -> PathBuf {
    root.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Walks a directory tree and classifies Kubernetes RBAC manifests.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    excluded: Vec<String>,
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self {
            excluded: EXCLUDED_SEGMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add more whole-segment exclusions on top of [`EXCLUDED_SEGMENTS`].
    pub fn with_extra_excludes<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for segment in extra {
            let segment = segment.into();
            if !self.excluded.contains(&segment) {
                self.excluded.push(segment);
            }
        }
        self
    }

    /// Whether a path relative to the scan root sits under an excluded segment.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            Component::Normal(segment) => {
                let segment = segment.to_string_lossy();
                self.excluded.iter().any(|e| *e == segment)
            }
            _ => false,
        })
    }

    /// List every `*.yaml` file under `root` that is not excluded, sorted.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|source| ScanError::Unreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let base = normalized_root(root);
        let pattern = if base.as_os_str().is_empty() {
            "**/*.yaml".to_string()
        } else {
            format!("{}/**/*.yaml", glob::Pattern::escape(&base.to_string_lossy()))
        };
        let entries = glob::glob(&pattern).map_err(|e| ScanError::Unreadable {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable path");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            // Exclusion only ever looks below the root
            let excluded = match path.strip_prefix(&base) {
                Ok(relative) => self.is_excluded(relative),
                Err(_) => {
                    debug!(file = %path.display(), root = %base.display(), "Path not under scan root, exclusion skipped");
                    false
                }
            };
            if excluded {
                debug!(file = %path.display(), "Excluded by path segment");
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    /// Load every manifest under `root`. Individual bad files never abort the scan.
    pub fn load(&self, root: &Path) -> Result<ManifestSet, ScanError> {
        let files = self.discover(root)?;
        let mut set = ManifestSet::default();

        for file in &files {
            let source_file = file.display().to_string();
            let content = match std::fs::read_to_string(file) {
                Ok(content) => content,
                Err(e) => {
                    let err = ManifestError::from(e);
                    if is_template(&source_file, "") {
                        debug!(file = %source_file, error = %err, "Skipping unreadable template");
                    } else {
                        warn!(file = %source_file, error = %err, "Failed to parse manifest");
                    }
                    continue;
                }
            };
            load_content(&mut set, &content, &source_file);
        }

        debug!(files = files.len(), "Manifest scan complete");
        Ok(set)
    }
}

/// Parse one file's content into `set`.
///
/// A YAML syntax error ends the file: the remaining documents of a broken
/// stream cannot be located reliably.
pub fn load_content(set: &mut ManifestSet, content: &str, source_file: &str) {
    let template = is_template(source_file, content);
    let content = if template {
        preprocess_template(content)
    } else {
        Cow::Borrowed(content)
    };

    for document in serde_yaml::Deserializer::from_str(&content) {
        let doc = match Value::deserialize(document) {
            Ok(doc) => doc,
            Err(e) => {
                let err = ManifestError::from(e);
                if template {
                    debug!(file = %source_file, error = %err, "Template did not parse after substitution");
                } else {
                    warn!(file = %source_file, error = %err, "Failed to parse manifest");
                }
                break;
            }
        };
        categorize(set, &doc, source_file);
    }
}

fn categorize(set: &mut ManifestSet, doc: &Value, source_file: &str) {
    let kind = match doc.get("kind").and_then(|k| k.as_str()) {
        Some(kind) => kind,
        None => {
            debug!(file = %source_file, "Skipping document without kind");
            return;
        }
    };

    let metadata = doc.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(scalar_to_string)
        .unwrap_or_else(|| "unknown".to_string());
    let declared_namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(scalar_to_string);
    let namespace = declared_namespace
        .clone()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    match kind {
        "ClusterRole" => {
            let role = ClusterRole {
                name: name.clone(),
                rules: parse_rules(doc.get("rules")),
                aggregation_selectors: doc.get("aggregationRule").map(parse_aggregation),
                source_file: source_file.to_string(),
            };
            if let Some(previous) = set.cluster_roles.insert(name.clone(), role) {
                info!(
                    cluster_role = %name,
                    previous = %previous.source_file,
                    current = %source_file,
                    "ClusterRole name collision, keeping the later definition"
                );
            }
        }
        "Role" => {
            let role = Role {
                namespace,
                name,
                rules: parse_rules(doc.get("rules")),
                source_file: source_file.to_string(),
            };
            set.roles.insert(role.key(), role);
        }
        "ClusterRoleBinding" | "RoleBinding" => {
            let binding_kind = if kind == "ClusterRoleBinding" {
                BindingKind::ClusterRoleBinding
            } else {
                BindingKind::RoleBinding
            };
            let binding = Binding {
                kind: binding_kind,
                name,
                namespace: declared_namespace,
                role_ref: parse_role_ref(doc.get("roleRef"), binding_kind),
                subjects: parse_subjects(doc.get("subjects")),
                source_file: source_file.to_string(),
            };
            match binding_kind {
                BindingKind::ClusterRoleBinding => set.cluster_role_bindings.push(binding),
                BindingKind::RoleBinding => set.role_bindings.push(binding),
            }
        }
        "ServiceAccount" => {
            let account = ServiceAccount {
                namespace: namespace.clone(),
                name: name.clone(),
                source_file: source_file.to_string(),
            };
            set.service_accounts
                .insert(namespaced_key(&namespace, &name), account);
        }
        "Pod" => {
            let spec = doc.get("spec");
            let service_account = spec
                .and_then(|s| s.get("serviceAccountName"))
                .and_then(scalar_to_string)
                .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_string());
            let automount_token = spec
                .and_then(|s| s.get("automountServiceAccountToken"))
                .and_then(|v| v.as_bool())
                .unwrap_or(true);
            let pod = Pod {
                namespace,
                name,
                service_account,
                automount_token,
                source_file: source_file.to_string(),
            };
            set.pods.insert(pod.key(), pod);
        }
        _ => {}
    }
}

/// Strings, numbers and booleans as text; anything else is ignored.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(seq)) => seq.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn parse_rules(value: Option<&Value>) -> Vec<PolicyRule> {
    value
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .map(|rule| PolicyRule {
                    resources: string_list(rule.get("resources")),
                    verbs: string_list(rule.get("verbs")),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_aggregation(rule: &Value) -> Vec<LabelSelector> {
    let selectors = match rule.get("clusterRoleSelectors").and_then(|v| v.as_sequence()) {
        Some(seq) => seq,
        None => return Vec::new(),
    };

    selectors
        .iter()
        .map(|selector| {
            let match_labels = selector
                .get("matchLabels")
                .and_then(|v| v.as_mapping())
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
                        .collect()
                })
                .unwrap_or_default();
            let match_expressions = selector
                .get("matchExpressions")
                .and_then(|v| v.as_sequence())
                .map(|exprs| {
                    exprs
                        .iter()
                        .map(|expr| {
                            let key = expr.get("key").and_then(scalar_to_string).unwrap_or_default();
                            let operator = expr
                                .get("operator")
                                .and_then(scalar_to_string)
                                .unwrap_or_default();
                            let values = string_list(expr.get("values"));
                            if values.is_empty() {
                                format!("{} {}", key, operator)
                            } else {
                                format!("{} {} [{}]", key, operator, values.join(", "))
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();
            LabelSelector {
                match_labels,
                match_expressions,
            }
        })
        .collect()
}

fn parse_role_ref(value: Option<&Value>, binding_kind: BindingKind) -> RoleRef {
    let name = value
        .and_then(|v| v.get("name"))
        .and_then(scalar_to_string)
        .unwrap_or_else(|| "unknown".to_string());
    let kind = match binding_kind {
        BindingKind::ClusterRoleBinding => RoleKind::ClusterRole,
        BindingKind::RoleBinding => match value.and_then(|v| v.get("kind")).and_then(|k| k.as_str()) {
            Some("ClusterRole") => RoleKind::ClusterRole,
            _ => RoleKind::Role,
        },
    };
    RoleRef { kind, name }
}

fn parse_subjects(value: Option<&Value>) -> Vec<Subject> {
    value
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .map(|subject| Subject {
                    kind: SubjectKind::parse(
                        subject.get("kind").and_then(|k| k.as_str()).unwrap_or(""),
                    ),
                    name: subject.get("name").and_then(scalar_to_string),
                    namespace: subject.get("namespace").and_then(scalar_to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}
