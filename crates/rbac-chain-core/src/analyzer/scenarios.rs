//! Attack-scenario catalog.
//!
//! Static prose attached to findings by key. It describes how each permission
//! pattern is exploited in practice and is only printed in private mode.

/// Canned narrative for one dangerous permission pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackScenario {
    pub key: &'static str,
    pub title: &'static str,
    pub attack_chain: &'static [&'static str],
    pub detection: &'static [&'static str],
    pub remediation: &'static str,
}

pub const SCENARIOS: &[AttackScenario] = &[
    AttackScenario {
        key: "wildcard_resources",
        title: "Wildcard resource access",
        attack_chain: &[
            "Attacker obtains the token of a subject bound to the role (compromised Pod, leaked kubeconfig)",
            "Enumerates every API resource the role covers with `kubectl auth can-i --list`",
            "Reads Secrets and ConfigMaps across the granted scope to harvest further credentials",
            "Uses newly discovered credentials to pivot to cloud or CI systems",
        ],
        detection: &[
            "Audit log: a single identity touching many distinct resource types in a short window",
            "Audit log: `list` on secrets from a ServiceAccount that normally never reads them",
        ],
        remediation: "Enumerate the exact resources the workload needs and list them explicitly",
    },
    AttackScenario {
        key: "wildcard_verbs",
        title: "Wildcard verb access",
        attack_chain: &[
            "Attacker uses the bound identity to `delete`, `patch` or `deletecollection` resources",
            "Modifies workloads in place to inject a malicious container or sidecar",
            "Uses `escalate`/`bind` implicitly granted by `*` to widen its own permissions",
        ],
        detection: &[
            "Audit log: mutating verbs from identities expected to be read-only",
            "Admission logs: unexpected image or command changes on existing workloads",
        ],
        remediation: "Replace `*` with the minimal verb list (typically get/list/watch)",
    },
    AttackScenario {
        key: "dangerous_verb_escalate",
        title: "RBAC escalate verb",
        attack_chain: &[
            "Attacker edits a Role or ClusterRole it can modify",
            "Adds permissions it does not itself hold; `escalate` skips the API server's escalation check",
            "Binds the expanded role to its own identity and gains those permissions",
        ],
        detection: &[
            "Audit log: `update`/`patch` on roles or clusterroles adding new rules",
            "Diff of RBAC objects against the version in source control",
        ],
        remediation: "Remove `escalate`; grant role-editing only to cluster administrators",
    },
    AttackScenario {
        key: "dangerous_verb_impersonate",
        title: "User, group or ServiceAccount impersonation",
        attack_chain: &[
            "Attacker sends requests with `Impersonate-User` or `Impersonate-Group` headers",
            "Impersonates `system:masters` or a cluster-admin user",
            "Performs any action as the impersonated identity",
        ],
        detection: &[
            "Audit log: requests carrying `impersonatedUser` from unexpected principals",
        ],
        remediation: "Remove `impersonate` or restrict it with `resourceNames` to specific identities",
    },
    AttackScenario {
        key: "dangerous_resource_secrets",
        title: "Secret read access",
        attack_chain: &[
            "Attacker lists Secrets in the granted scope",
            "Extracts ServiceAccount tokens, registry credentials and cloud keys",
            "Authenticates as the stolen identities to move laterally",
        ],
        detection: &[
            "Audit log: `get`/`list`/`watch` on secrets from workload ServiceAccounts",
        ],
        remediation: "Restrict secret access with `resourceNames` or mount only the Secrets a Pod needs",
    },
    AttackScenario {
        key: "dangerous_resource_pods_exec",
        title: "Pod exec/attach",
        attack_chain: &[
            "Attacker opens a shell in a running Pod with `kubectl exec` or attaches to its process",
            "Reads the Pod's mounted ServiceAccount token and environment secrets",
            "Uses the Pod's identity and network position to pivot further",
        ],
        detection: &[
            "Audit log: `create` on `pods/exec` or `pods/attach` subresources",
            "Runtime security: interactive shells spawned inside application containers",
        ],
        remediation: "Remove exec/attach from workload roles; use ephemeral debug containers under break-glass access",
    },
    AttackScenario {
        key: "escalation_create_pods",
        title: "Privileged Pod creation",
        attack_chain: &[
            "Attacker creates a Pod that runs as any ServiceAccount in the namespace",
            "Mounts the host filesystem or requests a privileged security context",
            "Escapes to the node and reads credentials of every Pod scheduled there",
        ],
        detection: &[
            "Audit log: Pod creation by identities that do not normally deploy workloads",
            "Admission policy violations for hostPath, hostPID or privileged containers",
        ],
        remediation: "Restrict Pod creation to deployment controllers and enforce Pod Security Admission `restricted`",
    },
    AttackScenario {
        key: "escalation_create_rolebindings",
        title: "Role and binding modification",
        attack_chain: &[
            "Attacker creates or patches a RoleBinding or ClusterRoleBinding",
            "Binds an existing powerful role (such as cluster-admin) to its own identity",
            "Gains every permission of that role",
        ],
        detection: &[
            "Audit log: `create`/`patch` on rolebindings or clusterrolebindings",
            "Alert on any new binding that references cluster-admin",
        ],
        remediation: "Grant RBAC write access only to cluster administrators and GitOps controllers",
    },
];

pub fn lookup(key: &str) -> Option<&'static AttackScenario> {
    SCENARIOS.iter().find(|s| s.key == key)
}
