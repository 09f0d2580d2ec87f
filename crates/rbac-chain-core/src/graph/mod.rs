use crate::manifest::{namespaced_key, BindingKind, RoleKind, SubjectKind, DEFAULT_NAMESPACE};
use crate::relationships::Relationships;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    ClusterRole,
    Role,
    ClusterRoleBinding,
    RoleBinding,
    ServiceAccount,
    Pod,
}

impl NodeKind {
    pub fn label(&self) -> &str {
        match self {
            NodeKind::ClusterRole => "ClusterRole",
            NodeKind::Role => "Role",
            NodeKind::ClusterRoleBinding => "ClusterRoleBinding",
            NodeKind::RoleBinding => "RoleBinding",
            NodeKind::ServiceAccount => "ServiceAccount",
            NodeKind::Pod => "Pod",
        }
    }

    fn color(&self) -> &str {
        match self {
            NodeKind::ClusterRole => "#ef4444",
            NodeKind::Role => "#f59e0b",
            NodeKind::ClusterRoleBinding | NodeKind::RoleBinding => "#8b5cf6",
            NodeKind::ServiceAccount => "#3b82f6",
            NodeKind::Pod => "#22c55e",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub kind: NodeKind,
    /// Name for cluster-scoped objects, `namespace/name` otherwise.
    pub name: String,
}

/// Edge types in the privilege graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEdge {
    /// Role -> binding that references it.
    RoleRef,
    /// Binding -> ServiceAccount it names as a subject.
    Subject,
    /// ServiceAccount -> Pod that runs as it.
    RunsAs,
}

/// ClusterRole/Role -> binding -> ServiceAccount -> Pod graph.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    node_map: HashMap<(NodeKind, String), NodeIndex>,
}

impl PrivilegeGraph {
    pub fn build(relationships: &Relationships<'_>) -> Self {
        let manifests = relationships.manifests();
        let mut graph = Self::default();

        for name in manifests.cluster_roles.keys() {
            graph.node(NodeKind::ClusterRole, name);
        }
        for key in manifests.roles.keys() {
            graph.node(NodeKind::Role, key);
        }

        for binding in manifests.bindings() {
            let namespace = binding.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
            let binding_idx = match binding.kind {
                BindingKind::ClusterRoleBinding => {
                    graph.node(NodeKind::ClusterRoleBinding, &binding.name)
                }
                BindingKind::RoleBinding => graph.node(
                    NodeKind::RoleBinding,
                    &namespaced_key(namespace, &binding.name),
                ),
            };
            let role_idx = match binding.role_ref.kind {
                RoleKind::ClusterRole => graph.node(NodeKind::ClusterRole, &binding.role_ref.name),
                RoleKind::Role => graph.node(
                    NodeKind::Role,
                    &namespaced_key(namespace, &binding.role_ref.name),
                ),
            };
            graph.edge(role_idx, binding_idx, GraphEdge::RoleRef);

            let subject_default = match binding.kind {
                BindingKind::ClusterRoleBinding => DEFAULT_NAMESPACE,
                BindingKind::RoleBinding => namespace,
            };
            for subject in &binding.subjects {
                if subject.kind != SubjectKind::ServiceAccount {
                    continue;
                }
                let Some(name) = subject.name.as_deref() else {
                    continue;
                };
                let sa_namespace = subject.namespace.as_deref().unwrap_or(subject_default);
                let sa_idx = graph.node(NodeKind::ServiceAccount, &namespaced_key(sa_namespace, name));
                graph.edge(binding_idx, sa_idx, GraphEdge::Subject);
            }
        }

        for (pod_key, pod) in &manifests.pods {
            let sa_idx = graph.node(NodeKind::ServiceAccount, &pod.service_account_key());
            let pod_idx = graph.node(NodeKind::Pod, pod_key);
            graph.edge(sa_idx, pod_idx, GraphEdge::RunsAs);
        }

        graph
    }

    fn node(&mut self, kind: NodeKind, name: &str) -> NodeIndex {
        if let Some(idx) = self.node_map.get(&(kind, name.to_string())) {
            return *idx;
        }
        let idx = self.graph.add_node(GraphNode {
            kind,
            name: name.to_string(),
        });
        self.node_map.insert((kind, name.to_string()), idx);
        idx
    }

    fn edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, kind: NodeKind, name: &str) -> Option<NodeIndex> {
        self.node_map.get(&(kind, name.to_string())).copied()
    }

    /// Pods that end up holding the permissions of the given node.
    pub fn pods_reachable_from(&self, kind: NodeKind, name: &str) -> Vec<String> {
        let Some(start) = self.find(kind, name) else {
            return Vec::new();
        };
        let mut pods = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            let node = &self.graph[idx];
            if node.kind == NodeKind::Pod {
                pods.push(node.name.clone());
            }
        }
        pods.sort();
        pods
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

fn node_id(idx: NodeIndex) -> String {
    format!("n{}", idx.index())
}

/// Generate a Mermaid flowchart of the privilege graph.
pub fn to_mermaid(graph: &PrivilegeGraph) -> String {
    let mut lines = Vec::new();
    lines.push("graph LR".to_string());

    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        lines.push(format!(
            "    {}[\"{}\\n{}\"]",
            node_id(idx),
            node.kind.label(),
            node.name.replace('"', "'")
        ));
    }

    for edge in graph.graph.edge_indices() {
        if let Some((source, target)) = graph.graph.edge_endpoints(edge) {
            lines.push(format!("    {} --> {}", node_id(source), node_id(target)));
        }
    }

    for idx in graph.graph.node_indices() {
        lines.push(format!(
            "    style {} fill:{},color:#fff",
            node_id(idx),
            graph.graph[idx].kind.color()
        ));
    }

    lines.join("\n")
}

/// Generate a DOT (Graphviz) representation of the privilege graph.
pub fn to_dot(graph: &PrivilegeGraph) -> String {
    let mut lines = Vec::new();
    lines.push("digraph \"rbac\" {".to_string());
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];".to_string());
    lines.push("    edge [color=\"#666666\"];".to_string());
    lines.push(String::new());

    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        lines.push(format!(
            "    {} [label=\"{}\\n{}\", fillcolor=\"{}\", fontcolor=\"#ffffff\"];",
            node_id(idx),
            node.kind.label(),
            node.name.replace('"', "\\\""),
            node.kind.color()
        ));
    }

    lines.push(String::new());

    for edge in graph.graph.edge_indices() {
        if let Some((source, target)) = graph.graph.edge_endpoints(edge) {
            let style = match graph.graph[edge] {
                GraphEdge::RoleRef => "",
                GraphEdge::Subject => " [style=dashed]",
                GraphEdge::RunsAs => " [style=dotted]",
            };
            lines.push(format!("    {} -> {}{};", node_id(source), node_id(target), style));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}
