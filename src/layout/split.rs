use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::ir::{GraphEdge, GraphNode, NodeKind, Position, Size};

use super::layout_subset;
use super::types::{Bounds, GroupFrame};

/// Nodes of a grouped graph sorted into the three regions the composer
/// places independently.
#[derive(Debug, Default)]
struct Regions<'a> {
    children: Vec<&'a GraphNode>,
    outside: Vec<&'a GraphNode>,
    adjacent: Vec<&'a GraphNode>,
}

fn partition_regions<'a>(
    nodes: &'a [GraphNode],
    edges: &[GraphEdge],
    group_id: &str,
) -> Regions<'a> {
    let child_ids: HashSet<&str> = nodes
        .iter()
        .filter(|node| {
            node.kind != NodeKind::Group && node.parent_id.as_deref() == Some(group_id)
        })
        .map(|node| node.id.as_str())
        .collect();

    let mut regions = Regions::default();
    for node in nodes {
        if node.kind == NodeKind::Group && node.id == group_id {
            continue;
        }
        if child_ids.contains(node.id.as_str()) {
            regions.children.push(node);
        } else if is_group_adjacent(node, edges, &child_ids) {
            regions.adjacent.push(node);
        } else {
            regions.outside.push(node);
        }
    }
    regions
}

/// A database-class node whose every edge ends at a group child.
fn is_group_adjacent(node: &GraphNode, edges: &[GraphEdge], child_ids: &HashSet<&str>) -> bool {
    if !node.kind.is_database_class() || node.parent_id.is_some() {
        return false;
    }
    let mut touching = edges
        .iter()
        .filter_map(|edge| {
            if edge.source == node.id {
                Some(edge.target.as_str())
            } else if edge.target == node.id {
                Some(edge.source.as_str())
            } else {
                None
            }
        })
        .peekable();
    touching.peek().is_some() && touching.all(|other| child_ids.contains(other))
}

fn subset_edges(members: &[&GraphNode], edges: &[GraphEdge]) -> Vec<GraphEdge> {
    let ids: HashSet<&str> = members.iter().map(|node| node.id.as_str()).collect();
    edges
        .iter()
        .filter(|edge| ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str()))
        .cloned()
        .collect()
}

fn owned(members: &[&GraphNode]) -> Vec<GraphNode> {
    members.iter().map(|&node| node.clone()).collect()
}

fn bounds_of(
    positions: &HashMap<String, Position>,
    sizes: &HashMap<String, Size>,
    fallback: Size,
) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for (id, position) in positions {
        let size = sizes.get(id).copied().unwrap_or(fallback);
        let next = Bounds {
            min_x: position.x,
            min_y: position.y,
            max_x: position.x + size.width,
            max_y: position.y + size.height,
        };
        bounds = Some(match bounds {
            Some(current) => current.union(next),
            None => next,
        });
    }
    bounds
}

fn translate(positions: &mut HashMap<String, Position>, dx: f32, dy: f32) {
    for position in positions.values_mut() {
        position.x += dx;
        position.y += dy;
    }
}

/// Lay out a grouped graph as three composed regions.
///
/// Group children are laid out on their own and wrapped in a frame whose
/// top-left sits at `split.group_position`. Everything else goes to the right
/// of the frame, `gap_between_group_and_rest` away and vertically centered on
/// it, except database-class nodes that only talk to group children: those
/// form one row under the frame, `gap_below_group` below it, ordered by the
/// children they serve. Returned nodes keep input order.
pub(super) fn compose_split_layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    group_id: &str,
    sizes: &HashMap<String, Size>,
    config: &LayoutConfig,
) -> (Vec<GraphNode>, GroupFrame) {
    let split = &config.split;
    let fallback = config.default_size();
    let size_of = |id: &str| sizes.get(id).copied().unwrap_or(fallback);
    let regions = partition_regions(nodes, edges, group_id);

    let mut child_positions = layout_subset(
        &owned(&regions.children),
        &subset_edges(&regions.children, edges),
        sizes,
        config,
    );
    let child_bounds = bounds_of(&child_positions, sizes, fallback);

    let frame_size = match child_bounds {
        Some(bounds) if split.auto_resize_group => {
            let margin = 2.0 * split.group_padding + split.edge_clearance;
            Size::new(bounds.width() + margin, bounds.height() + margin)
        }
        _ => split.group_size,
    };
    let frame = GroupFrame {
        id: group_id.to_string(),
        x: split.group_position.x,
        y: split.group_position.y,
        width: frame_size.width,
        height: frame_size.height,
        children: regions.children.iter().map(|node| node.id.clone()).collect(),
    };
    let (frame_cx, frame_cy) = frame.bounds().center();

    if let Some(bounds) = child_bounds {
        let (cx, cy) = bounds.center();
        translate(&mut child_positions, frame_cx - cx, frame_cy - cy);
    }

    let mut outside_positions = layout_subset(
        &owned(&regions.outside),
        &subset_edges(&regions.outside, edges),
        sizes,
        config,
    );
    if let Some(bounds) = bounds_of(&outside_positions, sizes, fallback) {
        let dx = frame.right() + split.gap_between_group_and_rest - bounds.min_x;
        let dy = frame_cy - bounds.center().1;
        translate(&mut outside_positions, dx, dy);
    }

    let adjacent_positions = place_adjacent_row(
        &regions.adjacent,
        edges,
        &child_positions,
        &size_of,
        &frame,
        config,
    );

    tracing::debug!(
        children = regions.children.len(),
        outside = regions.outside.len(),
        adjacent = regions.adjacent.len(),
        frame_width = frame.width,
        frame_height = frame.height,
        "composed split layout"
    );

    let placed = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if node.kind == NodeKind::Group && node.id == group_id {
                node.position = Position::new(frame.x, frame.y);
                node.size = frame_size;
                return node;
            }
            node.size = size_of(&node.id);
            if let Some(&position) = child_positions
                .get(&node.id)
                .or_else(|| outside_positions.get(&node.id))
                .or_else(|| adjacent_positions.get(&node.id))
            {
                node.position = position;
            }
            node
        })
        .collect();
    (placed, frame)
}

/// One row of group-adjacent nodes centered under the frame. Each node is
/// keyed by the mean center x of the children it connects to.
fn place_adjacent_row(
    adjacent: &[&GraphNode],
    edges: &[GraphEdge],
    child_positions: &HashMap<String, Position>,
    size_of: &impl Fn(&str) -> Size,
    frame: &GroupFrame,
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    let mut positions = HashMap::new();
    if adjacent.is_empty() {
        return positions;
    }

    let child_center_x = |id: &str| {
        child_positions
            .get(id)
            .map(|position| position.x + size_of(id).width / 2.0)
    };
    let mut keyed: Vec<(f32, usize, &GraphNode)> = adjacent
        .iter()
        .enumerate()
        .map(|(idx, &node)| {
            let xs: Vec<f32> = edges
                .iter()
                .filter_map(|edge| {
                    if edge.source == node.id {
                        child_center_x(&edge.target)
                    } else if edge.target == node.id {
                        child_center_x(&edge.source)
                    } else {
                        None
                    }
                })
                .collect();
            let key = if xs.is_empty() {
                f32::INFINITY
            } else {
                xs.iter().sum::<f32>() / xs.len() as f32
            };
            (key, idx, node)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let row_width = keyed
        .iter()
        .map(|(_, _, node)| size_of(&node.id).width)
        .sum::<f32>()
        + config.node_spacing * (keyed.len() - 1) as f32;
    let y = frame.bottom() + config.split.gap_below_group;
    let mut x = frame.x + frame.width / 2.0 - row_width / 2.0;
    for (_, _, node) in keyed {
        positions.insert(node.id.clone(), Position::new(x, y));
        x += size_of(&node.id).width + config.node_spacing;
    }
    positions
}
