use crate::manifest::PolicyRule;
use std::collections::BTreeSet;

/// Verbs that let a subject bypass or extend RBAC.
pub const DANGEROUS_VERBS: &[&str] = &["escalate", "impersonate", "bind", "*"];

/// Resources whose access amounts to credential theft, node access or RBAC control.
pub const DANGEROUS_RESOURCES: &[&str] = &[
    "*",
    "secrets",
    "persistentvolumes",
    "nodes",
    "clusterroles",
    "clusterrolebindings",
    "pods/exec",
    "pods/attach",
];

/// A verb/resource pairing that lets a subject grant itself more access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationCombo {
    pub verbs: &'static [&'static str],
    pub resources: &'static [&'static str],
    /// Attack-scenario catalog key.
    pub scenario: &'static str,
}

pub const ESCALATION_COMBOS: &[EscalationCombo] = &[
    EscalationCombo {
        verbs: &["create", "patch", "update"],
        resources: &["roles", "clusterroles", "rolebindings", "clusterrolebindings"],
        scenario: "escalation_create_rolebindings",
    },
    EscalationCombo {
        verbs: &["create"],
        resources: &["pods"],
        scenario: "escalation_create_pods",
    },
];

impl EscalationCombo {
    pub fn message(&self) -> String {
        format!(
            "Escalation risk: {} on {}",
            self.verbs.join("/"),
            self.resources.join("/")
        )
    }

    /// Both sets must intersect; `verbs` and `resources` are already lowercased.
    pub fn matches(&self, verbs: &BTreeSet<String>, resources: &BTreeSet<String>) -> bool {
        self.verbs.iter().any(|v| verbs.contains(*v))
            && self.resources.iter().any(|r| resources.contains(*r))
    }
}

/// Everything dangerous found in one role's merged rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleAssessment {
    pub wildcard_resources: bool,
    pub wildcard_verbs: bool,
    pub dangerous_verbs: BTreeSet<String>,
    pub dangerous_resources: BTreeSet<String>,
    /// Triggered combos, first occurrence order, one entry per message.
    pub escalations: Vec<EscalationCombo>,
}

impl RuleAssessment {
    pub fn has_wildcard(&self) -> bool {
        self.wildcard_resources || self.wildcard_verbs
    }

    pub fn is_empty(&self) -> bool {
        !self.has_wildcard()
            && self.dangerous_verbs.is_empty()
            && self.dangerous_resources.is_empty()
            && self.escalations.is_empty()
    }

    /// Human-readable issue lines.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.wildcard_resources {
            issues.push("Wildcard resources (*)".to_string());
        }
        if self.wildcard_verbs {
            issues.push("Wildcard verbs (*)".to_string());
        }
        if !self.dangerous_verbs.is_empty() {
            issues.push(format!(
                "Dangerous verbs: {}",
                join(&self.dangerous_verbs)
            ));
        }
        if !self.dangerous_resources.is_empty() {
            issues.push(format!(
                "Dangerous resources: {}",
                join(&self.dangerous_resources)
            ));
        }
        issues.extend(self.escalations.iter().map(EscalationCombo::message));
        issues
    }

    /// Attack-scenario catalog keys that apply, without duplicates.
    pub fn scenario_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut push = |key: &'static str| {
            if !keys.contains(&key) {
                keys.push(key);
            }
        };
        if self.wildcard_resources {
            push("wildcard_resources");
        }
        if self.wildcard_verbs {
            push("wildcard_verbs");
        }
        if self.dangerous_verbs.contains("escalate") {
            push("dangerous_verb_escalate");
        }
        if self.dangerous_verbs.contains("impersonate") {
            push("dangerous_verb_impersonate");
        }
        if self.dangerous_resources.contains("secrets") {
            push("dangerous_resource_secrets");
        }
        if self.dangerous_resources.contains("pods/exec")
            || self.dangerous_resources.contains("pods/attach")
        {
            push("dangerous_resource_pods_exec");
        }
        for combo in &self.escalations {
            push(combo.scenario);
        }
        keys
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn lowered(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

/// Classify a role's rules against the policy table.
///
/// Wildcards and dangerous verbs/resources are judged on the union of all
/// rules. Escalation combos must match inside a single rule.
pub fn assess_rules(rules: &[PolicyRule]) -> RuleAssessment {
    let mut assessment = RuleAssessment::default();

    for rule in rules {
        let verbs = lowered(&rule.verbs);
        let resources = lowered(&rule.resources);

        assessment.wildcard_resources |= resources.contains("*");
        assessment.wildcard_verbs |= verbs.contains("*");

        assessment.dangerous_verbs.extend(
            verbs
                .iter()
                .filter(|v| DANGEROUS_VERBS.contains(&v.as_str()))
                .cloned(),
        );
        assessment.dangerous_resources.extend(
            resources
                .iter()
                .filter(|r| DANGEROUS_RESOURCES.contains(&r.as_str()))
                .cloned(),
        );

        for combo in ESCALATION_COMBOS {
            if combo.matches(&verbs, &resources)
                && !assessment
                    .escalations
                    .iter()
                    .any(|seen| seen.message() == combo.message())
            {
                assessment.escalations.push(*combo);
            }
        }
    }

    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(resources: &[&str], verbs: &[&str]) -> PolicyRule {
        PolicyRule {
            resources: resources.iter().map(|s| s.to_string()).collect(),
            verbs: verbs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_policy_table_contents() {
        assert_eq!(DANGEROUS_VERBS.len(), 4);
        assert!(DANGEROUS_RESOURCES.contains(&"pods/exec"));
        assert_eq!(
            ESCALATION_COMBOS[1].message(),
            "Escalation risk: create on pods"
        );
    }

    #[test]
    fn test_wildcards_tracked_independently() {
        let a = assess_rules(&[rule(&["*"], &["get"])]);
        assert!(a.wildcard_resources);
        assert!(!a.wildcard_verbs);

        let b = assess_rules(&[rule(&["configmaps"], &["*"])]);
        assert!(!b.wildcard_resources);
        assert!(b.wildcard_verbs);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let a = assess_rules(&[rule(&["Secrets"], &["GET", "Escalate"])]);
        assert!(a.dangerous_resources.contains("secrets"));
        assert!(a.dangerous_verbs.contains("escalate"));
    }

    #[test]
    fn test_escalation_requires_same_rule() {
        let split = assess_rules(&[rule(&["pods"], &["get"]), rule(&["configmaps"], &["create"])]);
        assert!(split.escalations.is_empty());

        let together = assess_rules(&[rule(&["pods"], &["create"])]);
        assert_eq!(together.escalations.len(), 1);
        assert_eq!(together.scenario_keys(), vec!["escalation_create_pods"]);
    }

    #[test]
    fn test_escalation_deduplicated_per_role() {
        let a = assess_rules(&[
            rule(&["rolebindings"], &["create"]),
            rule(&["clusterroles"], &["patch"]),
        ]);
        assert_eq!(a.escalations.len(), 1);
        assert_eq!(
            a.issues(),
            vec![
                "Dangerous resources: clusterroles".to_string(),
                "Escalation risk: create/patch/update on roles/clusterroles/rolebindings/clusterrolebindings"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_harmless_rules_are_empty() {
        let a = assess_rules(&[rule(&["configmaps", "pods"], &["get", "list", "watch"])]);
        assert!(a.is_empty());
        assert!(a.issues().is_empty());
        assert!(a.scenario_keys().is_empty());
    }

    #[test]
    fn test_scenario_keys_for_exec_and_secrets() {
        let a = assess_rules(&[rule(&["pods/attach", "secrets"], &["get", "impersonate"])]);
        assert_eq!(
            a.scenario_keys(),
            vec![
                "dangerous_verb_impersonate",
                "dangerous_resource_secrets",
                "dangerous_resource_pods_exec"
            ]
        );
    }
}
