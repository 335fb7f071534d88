use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::inference::ReliancesMap;
use crate::ir::{
    GraphEdge, GraphNode, NodeKind, ResourceSummary, TopologyGraph, network_node_id,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node `{id}` declared as both {existing} and {incoming}")]
    ConflictingNode {
        id: String,
        existing: NodeKind,
        incoming: NodeKind,
    },
}

/// Accumulates nodes and edges while enforcing id uniqueness. Shared by the
/// builder and the grouping stage.
#[derive(Debug, Default)]
pub(crate) struct GraphAccumulator {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_ids: HashSet<String>,
}

impl GraphAccumulator {
    pub(crate) fn from_graph(graph: &TopologyGraph) -> Result<Self, GraphError> {
        let mut acc = Self::default();
        for node in &graph.nodes {
            acc.push_node(node.clone())?;
        }
        for edge in &graph.edges {
            acc.push_edge(edge.clone());
        }
        Ok(acc)
    }

    /// Adds `node` unless a node with the same id and kind exists. A kind
    /// mismatch is an error.
    pub(crate) fn push_node(&mut self, node: GraphNode) -> Result<(), GraphError> {
        if let Some(&idx) = self.node_index.get(&node.id) {
            let existing = self.nodes[idx].kind;
            if existing != node.kind {
                return Err(GraphError::ConflictingNode {
                    id: node.id,
                    existing,
                    incoming: node.kind,
                });
            }
            return Ok(());
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Adds `edge` when both endpoints exist and its id is new. Returns
    /// whether the edge was kept.
    pub(crate) fn push_edge(&mut self, edge: GraphEdge) -> bool {
        if edge.source == edge.target
            || !self.node_index.contains_key(&edge.source)
            || !self.node_index.contains_key(&edge.target)
            || self.edge_ids.contains(&edge.id)
        {
            return false;
        }
        self.edge_ids.insert(edge.id.clone());
        self.edges.push(edge);
        true
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        let idx = *self.node_index.get(id)?;
        self.nodes.get_mut(idx)
    }

    pub(crate) fn finish(self) -> TopologyGraph {
        TopologyGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// Turn resource summaries plus inferred reliances into a typed graph.
///
/// Every resource with at least one port gets exactly one synthetic network
/// node and an `owner -> network` edge. Reliances become
/// `dependency -> owner` edges; references to unknown resources are dropped.
pub fn build_graph(
    resources: &[ResourceSummary],
    reliances: &ReliancesMap,
    config: &LayoutConfig,
) -> Result<TopologyGraph, GraphError> {
    let size = config.default_size();
    let mut acc = GraphAccumulator::default();

    for res in resources {
        let mut node = GraphNode::new(&res.node_id(), res.resource_type.node_kind(), size);
        node.label = res.name.clone();
        node.resource_type = Some(res.resource_type);
        acc.push_node(node)?;
    }

    for res in resources {
        if res.ports.is_empty() {
            continue;
        }
        let owner_id = res.node_id();
        let network_id = network_node_id(&owner_id);
        let mut network = GraphNode::new(&network_id, NodeKind::Network, size);
        network.label = public_label(res);
        acc.push_node(network)?;

        let ports: Vec<String> = res.ports.iter().map(|port| port.label()).collect();
        acc.push_edge(GraphEdge::new(&owner_id, &network_id).with_label(ports.join(", ")));
    }

    let mut dropped = 0usize;
    for (owner, dependency) in reliances.iter() {
        let edge = GraphEdge::new(&dependency.node_id(), &owner.node_id());
        if !acc.push_edge(edge) {
            dropped += 1;
        }
    }

    let graph = acc.finish();
    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        dropped,
        "built topology graph"
    );
    Ok(graph)
}

fn public_label(res: &ResourceSummary) -> String {
    res.ports
        .iter()
        .find_map(|port| port.public_domain.clone())
        .unwrap_or_else(|| format!("{} network", res.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer_reliances;
    use crate::ir::{EnvVar, ResourceRef, ResourceType};

    fn build(resources: &[ResourceSummary]) -> TopologyGraph {
        let reliances = infer_reliances(resources);
        build_graph(resources, &reliances, &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn maps_resources_to_typed_nodes() {
        let graph = build(&[
            ResourceSummary::new("Web", ResourceType::Deployment),
            ResourceSummary::new("cache", ResourceType::StatefulSet),
            ResourceSummary::new("pg", ResourceType::Database),
            ResourceSummary::new("files", ResourceType::ObjectStorage),
        ]);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "deployment-web",
                "statefulset-cache",
                "database-pg",
                "objectstorage-files"
            ]
        );
        assert_eq!(graph.nodes[1].kind, NodeKind::Workload);
        assert_eq!(graph.nodes[3].kind, NodeKind::Storage);
        assert_eq!(graph.nodes[0].label, "Web");
        assert_eq!(graph.nodes[0].size.width, 200.0);
    }

    #[test]
    fn synthesizes_one_network_node_per_exposed_resource() {
        let graph =
            build(&[ResourceSummary::new("web", ResourceType::Deployment).with_ports(&[80, 443])]);
        let networks: Vec<&GraphNode> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Network)
            .collect();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].id, "network-deployment-web");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "deployment-web");
        assert_eq!(graph.edges[0].id, "deployment-web-network-deployment-web");
        assert_eq!(graph.edges[0].data.as_ref().unwrap().label, "80, 443");
    }

    #[test]
    fn reliance_edges_point_from_dependency_to_owner() {
        let graph = build(&[
            ResourceSummary::new("api", ResourceType::Deployment)
                .with_env(vec![EnvVar::literal("REDIS", "redis-abc123-credentials")]),
            ResourceSummary::new("redis-abc123", ResourceType::Database),
        ]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "database-redis-abc123");
        assert_eq!(graph.edges[0].target, "deployment-api");
        assert_eq!(graph.edges[0].id, "database-redis-abc123-deployment-api");
    }

    #[test]
    fn drops_edges_to_absent_resources() {
        let mut reliances = ReliancesMap::new();
        reliances.insert(
            &ResourceRef {
                name: "api".to_string(),
                resource_type: ResourceType::Deployment,
            },
            ResourceRef {
                name: "ghost".to_string(),
                resource_type: ResourceType::Database,
            },
        );
        let resources = vec![ResourceSummary::new("api", ResourceType::Deployment)];
        let graph = build_graph(&resources, &reliances, &LayoutConfig::default()).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn building_is_idempotent() {
        let resources = vec![
            ResourceSummary::new("api", ResourceType::Deployment)
                .with_env(vec![EnvVar::literal("DB", "pg")])
                .with_ports(&[8080]),
            ResourceSummary::new("pg", ResourceType::Database),
        ];
        assert_eq!(build(&resources), build(&resources));
    }

    #[test]
    fn network_ids_never_collide_with_resource_names() {
        let graph = build(&[
            ResourceSummary::new("web", ResourceType::Deployment).with_ports(&[80]),
            ResourceSummary::new("web-network", ResourceType::Deployment).with_ports(&[81]),
            ResourceSummary::new("network", ResourceType::Deployment),
        ]);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "deployment-web",
                "deployment-web-network",
                "deployment-network",
                "network-deployment-web",
                "network-deployment-web-network",
            ]
        );
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn accumulator_rejects_kind_conflicts() {
        let size = LayoutConfig::default().default_size();
        let mut acc = GraphAccumulator::default();
        acc.push_node(GraphNode::new("a", NodeKind::Workload, size)).unwrap();
        acc.push_node(GraphNode::new("a", NodeKind::Workload, size)).unwrap();
        let err = acc
            .push_node(GraphNode::new("a", NodeKind::Network, size))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::ConflictingNode {
                id: "a".to_string(),
                existing: NodeKind::Workload,
                incoming: NodeKind::Network,
            }
        );
        assert_eq!(acc.finish().nodes.len(), 1);
    }

    #[test]
    fn duplicate_resources_collapse() {
        let graph = build(&[
            ResourceSummary::new("web", ResourceType::Deployment).with_ports(&[80]),
            ResourceSummary::new("web", ResourceType::Deployment).with_ports(&[80]),
        ]);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
    }
}
