use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::ir::{GraphEdge, GraphNode, NodeKind};

/// Cross-axis spans already taken by placed network nodes, kept sorted by
/// start. Lookups are a linear scan, which is fine for tens of nodes; a
/// sorted interval tree would replace it for much larger graphs.
#[derive(Debug, Default)]
pub(super) struct OccupiedSpans {
    spans: Vec<(f32, f32)>,
}

impl OccupiedSpans {
    pub(super) fn is_free(&self, start: f32, end: f32) -> bool {
        self.spans.iter().all(|&(s, e)| end <= s || start >= e)
    }

    pub(super) fn insert(&mut self, start: f32, end: f32) {
        let idx = self.spans.partition_point(|&(s, _)| s < start);
        self.spans.insert(idx, (start, end));
    }

    /// Closest free start for an `extent`-long span near `desired`.
    ///
    /// Candidates alternate forward then backward in steps of
    /// `extent + spacing`. With `n` occupied spans at most `2n` forward
    /// candidates can be blocked, so the bound below normally finds a slot;
    /// otherwise the span goes after the last occupied one.
    pub(super) fn find_slot(&self, desired: f32, extent: f32, spacing: f32) -> f32 {
        if self.is_free(desired, desired + extent) {
            return desired;
        }
        let step = extent + spacing;
        let max_steps = 2 * self.spans.len() + 1;
        for k in 1..=max_steps {
            let offset = step * k as f32;
            let forward = desired + offset;
            if self.is_free(forward, forward + extent) {
                return forward;
            }
            let backward = desired - offset;
            if self.is_free(backward, backward + extent) {
                return backward;
            }
        }
        let last_end = self
            .spans
            .iter()
            .map(|&(_, end)| end)
            .fold(f32::NEG_INFINITY, f32::max);
        last_end + spacing
    }
}

/// The axis rows are laid out along: x for TB/BT, y for LR/RL.
#[derive(Debug, Clone, Copy)]
struct CrossAxis {
    horizontal: bool,
}

impl CrossAxis {
    fn start(self, node: &GraphNode) -> f32 {
        if self.horizontal {
            node.position.y
        } else {
            node.position.x
        }
    }

    fn extent(self, node: &GraphNode) -> f32 {
        if self.horizontal {
            node.size.height
        } else {
            node.size.width
        }
    }

    fn center(self, node: &GraphNode) -> f32 {
        self.start(node) + self.extent(node) / 2.0
    }

    fn set_start(self, node: &mut GraphNode, value: f32) {
        if self.horizontal {
            node.position.y = value;
        } else {
            node.position.x = value;
        }
    }
}

/// Place network nodes beside the workload that owns them.
///
/// Nodes are split by `parent_id`, so group members and outside nodes are
/// aligned independently. Within a partition, owners are visited in
/// cross-axis order; each owned network node is centered on its owner along
/// the cross axis unless that span is taken, in which case the nearest free
/// slot is used. Unowned network nodes go last through the same search.
/// Only the cross-axis coordinate changes.
pub(super) fn align_network_nodes(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    config: &LayoutConfig,
) -> Vec<GraphNode> {
    let axis = CrossAxis {
        horizontal: config.direction.is_horizontal(),
    };
    let mut partitions: BTreeMap<Option<&str>, Vec<&GraphNode>> = BTreeMap::new();
    for node in nodes {
        if node.kind == NodeKind::Group {
            continue;
        }
        partitions
            .entry(node.parent_id.as_deref())
            .or_default()
            .push(node);
    }

    let mut new_start: HashMap<&str, f32> = HashMap::new();
    for (partition, members) in &partitions {
        let placed = align_partition(members, edges, axis, config.alignment_spacing);
        tracing::trace!(partition = ?partition, placed = placed.len(), "aligned network nodes");
        new_start.extend(placed);
    }

    nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(&start) = new_start.get(node.id.as_str()) {
                axis.set_start(&mut node, start);
            }
            node
        })
        .collect()
}

fn align_partition<'a>(
    members: &[&'a GraphNode],
    edges: &[GraphEdge],
    axis: CrossAxis,
    spacing: f32,
) -> Vec<(&'a str, f32)> {
    let by_id: HashMap<&'a str, &'a GraphNode> = members
        .iter()
        .map(|&node: &&'a GraphNode| (node.id.as_str(), node))
        .collect();

    let mut owned: HashMap<&'a str, &'a GraphNode> = HashMap::new();
    let mut claimed: HashSet<&'a str> = HashSet::new();
    for edge in edges {
        let (Some(&owner), Some(&network)) = (
            by_id.get(edge.source.as_str()),
            by_id.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if owner.kind != NodeKind::Workload || network.kind != NodeKind::Network {
            continue;
        }
        if owned.contains_key(owner.id.as_str()) || claimed.contains(network.id.as_str()) {
            continue;
        }
        owned.insert(owner.id.as_str(), network);
        claimed.insert(network.id.as_str());
    }

    let mut workloads: Vec<&GraphNode> = members
        .iter()
        .copied()
        .filter(|node| node.kind == NodeKind::Workload)
        .collect();
    sort_along(&mut workloads, axis);

    let mut occupied = OccupiedSpans::default();
    let mut placed: Vec<(&'a str, f32)> = Vec::new();
    for workload in workloads {
        let Some(&network) = owned.get(workload.id.as_str()) else {
            continue;
        };
        let extent = axis.extent(network);
        let desired = axis.center(workload) - extent / 2.0;
        let start = occupied.find_slot(desired, extent, spacing);
        occupied.insert(start, start + extent);
        placed.push((network.id.as_str(), start));
    }

    let mut unowned: Vec<&'a GraphNode> = members
        .iter()
        .copied()
        .filter(|node| node.kind == NodeKind::Network && !claimed.contains(node.id.as_str()))
        .collect();
    sort_along(&mut unowned, axis);
    for network in unowned {
        let extent = axis.extent(network);
        let start = occupied.find_slot(axis.start(network), extent, spacing);
        occupied.insert(start, start + extent);
        placed.push((network.id.as_str(), start));
    }
    placed
}

fn sort_along(nodes: &mut [&GraphNode], axis: CrossAxis) {
    nodes.sort_by(|a, b| {
        axis.start(a)
            .total_cmp(&axis.start(b))
            .then_with(|| a.id.cmp(&b.id))
    });
}
