use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ir::{GraphEdge, GraphNode};

/// Distance from a rectangle edge within which a point counts as lying on it.
const SIDE_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Endpoints of a floating edge: where the line between two node centers
/// leaves each node's rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingEdge {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
    pub source_side: EdgeSide,
    pub target_side: EdgeSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGeometry {
    pub edge_id: String,
    #[serde(flatten)]
    pub ends: FloatingEdge,
}

pub fn floating_edge(source: &GraphNode, target: &GraphNode) -> FloatingEdge {
    let (sx, sy) = node_intersection(source, target);
    let (tx, ty) = node_intersection(target, source);
    FloatingEdge {
        sx,
        sy,
        tx,
        ty,
        source_side: edge_side(source, (sx, sy)),
        target_side: edge_side(target, (tx, ty)),
    }
}

/// Point where the segment from `node`'s center towards `other`'s center
/// crosses `node`'s boundary.
///
/// The direction is mapped into a space where the rectangle becomes the unit
/// diamond |u| + |v| = 1, normalized onto it, and mapped back.
pub fn node_intersection(node: &GraphNode, other: &GraphNode) -> (f32, f32) {
    let w = node.size.width / 2.0;
    let h = node.size.height / 2.0;
    let (cx, cy) = node.center();
    let (ox, oy) = other.center();
    if w <= 0.0 || h <= 0.0 {
        return (cx, cy);
    }

    let u = (ox - cx) / (2.0 * w) - (oy - cy) / (2.0 * h);
    let v = (ox - cx) / (2.0 * w) + (oy - cy) / (2.0 * h);
    let norm = u.abs() + v.abs();
    if norm <= f32::EPSILON {
        // Coincident centers: pick the top-center point.
        return (cx, node.position.y);
    }
    let a = 1.0 / norm;
    let (u, v) = (a * u, a * v);
    (w * (u + v) + cx, h * (-u + v) + cy)
}

/// Which side of `node` a boundary point lies on. Corners resolve in the
/// order top, right, bottom, left.
pub fn edge_side(node: &GraphNode, point: (f32, f32)) -> EdgeSide {
    let (px, py) = point;
    let left = node.position.x;
    let top = node.position.y;
    if py <= top + SIDE_TOLERANCE {
        EdgeSide::Top
    } else if px >= node.right() - SIDE_TOLERANCE {
        EdgeSide::Right
    } else if py >= node.bottom() - SIDE_TOLERANCE {
        EdgeSide::Bottom
    } else if px <= left + SIDE_TOLERANCE {
        EdgeSide::Left
    } else {
        EdgeSide::Top
    }
}

/// Floating-edge geometry for every edge whose endpoints are present.
pub fn edge_geometries(nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<EdgeGeometry> {
    let by_id: HashMap<&str, &GraphNode> =
        nodes.iter().map(|node| (node.id.as_str(), node)).collect();
    edges
        .iter()
        .filter_map(|edge| {
            let source = by_id.get(edge.source.as_str())?;
            let target = by_id.get(edge.target.as_str())?;
            Some(EdgeGeometry {
                edge_id: edge.id.clone(),
                ends: floating_edge(source, target),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{NodeKind, Position, Size};

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> GraphNode {
        let mut node = GraphNode::new(id, NodeKind::Workload, Size::new(w, h));
        node.position = Position::new(x, y);
        node
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn vertical_neighbours_meet_bottom_to_top() {
        let upper = rect("a", 0.0, 0.0, 100.0, 40.0);
        let lower = rect("b", 0.0, 200.0, 100.0, 40.0);
        let edge = floating_edge(&upper, &lower);
        assert!(close(edge.sx, 50.0) && close(edge.sy, 40.0));
        assert!(close(edge.tx, 50.0) && close(edge.ty, 200.0));
        assert_eq!(edge.source_side, EdgeSide::Bottom);
        assert_eq!(edge.target_side, EdgeSide::Top);
    }

    #[test]
    fn horizontal_neighbours_meet_right_to_left() {
        let left = rect("a", 0.0, 0.0, 100.0, 40.0);
        let right = rect("b", 300.0, 0.0, 100.0, 40.0);
        let edge = floating_edge(&left, &right);
        assert!(close(edge.sx, 100.0) && close(edge.sy, 20.0));
        assert!(close(edge.tx, 300.0) && close(edge.ty, 20.0));
        assert_eq!(edge.source_side, EdgeSide::Right);
        assert_eq!(edge.target_side, EdgeSide::Left);
    }

    #[test]
    fn diagonal_intersection_lies_on_the_boundary() {
        let node = rect("a", 0.0, 0.0, 100.0, 40.0);
        let other = rect("b", 400.0, 300.0, 100.0, 40.0);
        let (x, y) = node_intersection(&node, &other);
        let on_vertical = close(x, 0.0) || close(x, 100.0);
        let on_horizontal = close(y, 0.0) || close(y, 40.0);
        assert!(on_vertical || on_horizontal, "({x}, {y}) is not on the boundary");
        assert!((0.0..=100.0).contains(&x) && (0.0..=40.0).contains(&y));
    }

    #[test]
    fn corner_ties_prefer_top_then_right() {
        let node = rect("a", 0.0, 0.0, 100.0, 40.0);
        assert_eq!(edge_side(&node, (100.0, 0.0)), EdgeSide::Top);
        assert_eq!(edge_side(&node, (100.0, 40.0)), EdgeSide::Right);
        assert_eq!(edge_side(&node, (0.0, 40.0)), EdgeSide::Bottom);
        assert_eq!(edge_side(&node, (0.0, 20.0)), EdgeSide::Left);
    }

    #[test]
    fn coincident_centers_do_not_divide_by_zero() {
        let a = rect("a", 0.0, 0.0, 100.0, 40.0);
        let edge = floating_edge(&a, &a.clone());
        assert!(edge.sx.is_finite() && edge.sy.is_finite());
        assert_eq!(edge.source_side, EdgeSide::Top);
    }

    #[test]
    fn geometry_skips_edges_with_missing_nodes() {
        let nodes = vec![rect("a", 0.0, 0.0, 10.0, 10.0), rect("b", 0.0, 50.0, 10.0, 10.0)];
        let edges = vec![GraphEdge::new("a", "b"), GraphEdge::new("a", "ghost")];
        let geometry = edge_geometries(&nodes, &edges);
        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry[0].edge_id, "a-b");
    }
}
