use serde::{Deserialize, Serialize};

use crate::ir::{GraphEdge, GraphNode};

use super::geometry::EdgeGeometry;

/// Axis-aligned bounds of a set of node rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn of<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for node in nodes {
            let next = Bounds {
                min_x: node.position.x,
                min_y: node.position.y,
                max_x: node.right(),
                max_y: node.bottom(),
            };
            bounds = Some(match bounds {
                Some(current) => current.union(next),
                None => next,
            });
        }
        bounds
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, inner: &Bounds) -> bool {
        inner.min_x >= self.min_x
            && inner.min_y >= self.min_y
            && inner.max_x <= self.max_x
            && inner.max_y <= self.max_y
    }
}

/// Placed group frame, in global coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFrame {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub children: Vec<String>,
}

impl GroupFrame {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: self.x,
            min_y: self.y,
            max_x: self.x + self.width,
            max_y: self.y + self.height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub geometry: Vec<EdgeGeometry>,
    pub group: Option<GroupFrame>,
    pub bounds: Option<Bounds>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            geometry: Vec::new(),
            group: None,
            bounds: None,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}
