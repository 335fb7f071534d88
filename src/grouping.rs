use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::graph::{GraphAccumulator, GraphError};
use crate::ir::{GraphNode, NodeKind, TopologyGraph};

/// Ids of the nodes that run inside the group: every node of the configured
/// resource type plus the network nodes those nodes own. Dependencies of
/// grouped nodes are not members.
pub fn group_members(graph: &TopologyGraph, config: &LayoutConfig) -> Vec<String> {
    let group_type = config.split.group_resource_type;
    let grouped: HashSet<&str> = graph
        .nodes
        .iter()
        .filter(|node| node.kind != NodeKind::Group && node.resource_type == Some(group_type))
        .map(|node| node.id.as_str())
        .collect();
    if grouped.is_empty() {
        return Vec::new();
    }

    let owned_networks: HashSet<&str> = graph
        .edges
        .iter()
        .filter(|edge| grouped.contains(edge.source.as_str()))
        .map(|edge| edge.target.as_str())
        .filter(|target| {
            graph
                .node(target)
                .is_some_and(|node| node.kind == NodeKind::Network)
        })
        .collect();

    graph
        .nodes
        .iter()
        .filter(|node| {
            grouped.contains(node.id.as_str()) || owned_networks.contains(node.id.as_str())
        })
        .map(|node| node.id.clone())
        .collect()
}

/// Tag group members with `parent_id` and append the synthetic group node.
/// Without members the graph comes back unchanged.
pub fn apply_grouping(
    graph: &TopologyGraph,
    config: &LayoutConfig,
) -> Result<TopologyGraph, GraphError> {
    let members = group_members(graph, config);
    if members.is_empty() {
        return Ok(graph.clone());
    }

    let group_id = config.split.group_id.as_str();
    let mut acc = GraphAccumulator::from_graph(graph)?;
    let mut group = GraphNode::new(group_id, NodeKind::Group, config.split.group_size);
    group.label = config.split.group_resource_type.as_str().to_string();
    acc.push_node(group)?;

    for id in &members {
        if let Some(node) = acc.node_mut(id) {
            node.parent_id = Some(group_id.to_string());
        }
    }
    tracing::debug!(group = group_id, members = members.len(), "grouped nodes");
    Ok(acc.finish())
}
