mod align;
mod geometry;
mod position;
mod ranking;
mod split;
pub(crate) mod types;

pub use geometry::{
    EdgeGeometry, EdgeSide, FloatingEdge, edge_geometries, floating_edge, node_intersection,
};
pub use types::*;

use align::align_network_nodes;
use position::assign_positions;
use ranking::{assign_ranks, order_rank_nodes};
use split::compose_split_layout;

use crate::config::{ConfigError, LayoutConfig};
use crate::graph::{GraphAccumulator, GraphError, build_graph};
use crate::grouping::apply_grouping;
use crate::inference::infer_reliances;
use crate::ir::{GraphEdge, GraphNode, NodeKind, Position, ResourceSummary, Size, TopologyGraph};
use std::collections::{HashMap, HashSet};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid layout options: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid topology graph: {0}")]
    Graph(#[from] GraphError),
}

/// Caller-supplied node sizes, e.g. measured by the rendering host.
/// `None`, non-finite and non-positive sizes fall back to the configured
/// default.
pub trait SizeResolver {
    fn resolve(&self, node: &GraphNode) -> Option<Size>;
}

impl<F> SizeResolver for F
where
    F: Fn(&GraphNode) -> Option<Size>,
{
    fn resolve(&self, node: &GraphNode) -> Option<Size> {
        self(node)
    }
}

/// Resolver that always answers with the configured default size.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSizes;

impl SizeResolver for DefaultSizes {
    fn resolve(&self, _node: &GraphNode) -> Option<Size> {
        None
    }
}

/// Full pipeline from resource summaries: inference, graph construction,
/// grouping, layout.
pub fn layout_resources(
    resources: &[ResourceSummary],
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    config.validate()?;
    let reliances = infer_reliances(resources);
    let graph = build_graph(resources, &reliances, config)?;
    let graph = apply_grouping(&graph, config)?;
    compute_layout(&graph, config)
}

pub fn compute_layout(graph: &TopologyGraph, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    compute_layout_with_sizes(graph, config, &DefaultSizes)
}

/// Position every node of `graph` and compute edge geometry.
///
/// When the graph carries a group node the split composer places the group,
/// the rest and the group-adjacent row; otherwise the whole graph is laid out
/// as one ranked subset. Network alignment runs on the result either way.
pub fn compute_layout_with_sizes(
    graph: &TopologyGraph,
    config: &LayoutConfig,
    sizes: &impl SizeResolver,
) -> Result<Layout, LayoutError> {
    config.validate()?;
    if graph.is_empty() {
        return Ok(Layout::empty());
    }

    // Hand-built graphs get the same id checks as built ones.
    let normalized = GraphAccumulator::from_graph(graph)?.finish();
    let dropped = graph.edges.len() - normalized.edges.len();
    if dropped > 0 {
        tracing::debug!(dropped, "dropped self-loops, duplicate edges and dangling edges");
    }
    let graph = &normalized;
    let edges = normalized.edges.clone();

    let size_map = resolve_sizes(&graph.nodes, sizes, config);

    let (nodes, group) = match graph.group_node() {
        Some(group_node) => {
            let (nodes, frame) =
                compose_split_layout(&graph.nodes, &edges, &group_node.id, &size_map, config);
            (nodes, Some(frame))
        }
        None => {
            let positions = layout_subset(&graph.nodes, &edges, &size_map, config);
            let nodes = graph
                .nodes
                .iter()
                .map(|node| {
                    let mut node = node.clone();
                    if let Some(&size) = size_map.get(&node.id) {
                        node.size = size;
                    }
                    if let Some(&position) = positions.get(&node.id) {
                        node.position = position;
                    }
                    node
                })
                .collect();
            (nodes, None)
        }
    };

    let nodes = align_network_nodes(&nodes, &edges, config);
    let geometry = edge_geometries(&nodes, &edges);
    let bounds = Bounds::of(&nodes);
    let (width, height) = bounds.map_or((0.0, 0.0), |b| (b.width(), b.height()));

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        grouped = group.is_some(),
        width,
        height,
        "computed layout"
    );

    Ok(Layout {
        nodes,
        edges,
        geometry,
        group,
        bounds,
        width,
        height,
    })
}

fn resolve_sizes(
    nodes: &[GraphNode],
    resolver: &impl SizeResolver,
    config: &LayoutConfig,
) -> HashMap<String, Size> {
    let fallback = config.default_size();
    nodes
        .iter()
        .filter(|node| node.kind != NodeKind::Group)
        .map(|node| {
            let size = resolver
                .resolve(node)
                .filter(Size::is_usable)
                .unwrap_or(fallback);
            (node.id.clone(), size)
        })
        .collect()
}

/// Rank, order and position one set of nodes using only the edges between
/// them.
pub(super) fn layout_subset(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    sizes: &HashMap<String, Size>,
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    if nodes.is_empty() {
        return HashMap::new();
    }
    let ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let local: Vec<GraphEdge> = edges
        .iter()
        .filter(|edge| {
            ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str())
        })
        .cloned()
        .collect();

    let mut rank_nodes = assign_ranks(nodes, &local, config.max_nodes_per_rank);
    if config.edge_aware {
        order_rank_nodes(&mut rank_nodes, &local, config.barycentric_iterations);
    }
    tracing::trace!(
        nodes = nodes.len(),
        ranks = rank_nodes.iter().filter(|bucket| !bucket.is_empty()).count(),
        "ranked subset"
    );
    assign_positions(&rank_nodes, sizes, config)
}
