use crate::config::LayoutConfig;
use crate::ir::{Direction, Position};
use crate::layout::{EdgeSide, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub direction: Direction,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub group: Option<GroupDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub parent_id: Option<String>,
    /// Offset from the parent frame's top-left, for hosts that nest
    /// children inside their group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<Position>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    /// `[sx, sy, tx, ty]`, absent when an endpoint is missing.
    pub points: Option<[f32; 4]>,
    pub source_side: Option<EdgeSide>,
    pub target_side: Option<EdgeSide>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDump {
    pub id: String,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, config: &LayoutConfig) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: node.kind.to_string(),
                label: node.label.clone(),
                x: node.position.x,
                y: node.position.y,
                width: node.size.width,
                height: node.size.height,
                parent_id: node.parent_id.clone(),
                relative: node
                    .parent_id
                    .as_deref()
                    .and_then(|parent| layout.node(parent))
                    .map(|parent| node.relative_to(parent)),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| {
                let geometry = layout.geometry.iter().find(|g| g.edge_id == edge.id);
                EdgeDump {
                    id: edge.id.clone(),
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    label: edge.data.as_ref().map(|data| data.label.clone()),
                    points: geometry.map(|g| [g.ends.sx, g.ends.sy, g.ends.tx, g.ends.ty]),
                    source_side: geometry.map(|g| g.ends.source_side),
                    target_side: geometry.map(|g| g.ends.target_side),
                }
            })
            .collect();

        let group = layout.group.as_ref().map(|frame| GroupDump {
            id: frame.id.clone(),
            nodes: frame.children.clone(),
            x: frame.x,
            y: frame.y,
            width: frame.width,
            height: frame.height,
        });

        LayoutDump {
            direction: config.direction,
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            group,
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &Layout,
    config: &LayoutConfig,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout, config);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

pub fn print_layout_dump(layout: &Layout, config: &LayoutConfig) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, config);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &dump)?;
    writeln!(handle)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ResourceSummary, ResourceType};
    use crate::layout::layout_resources;

    #[test]
    fn dump_carries_geometry_and_group() {
        let resources = vec![
            ResourceSummary::new("dev", ResourceType::Devbox).with_ports(&[22]),
            ResourceSummary::new("api", ResourceType::Deployment),
        ];
        let config = LayoutConfig::default();
        let layout = layout_resources(&resources, &config).unwrap();
        let dump = LayoutDump::from_layout(&layout, &config);

        assert_eq!(dump.nodes.len(), layout.nodes.len());
        let edge = &dump.edges[0];
        assert_eq!(edge.from, "devbox-dev");
        assert_eq!(edge.label.as_deref(), Some("22"));
        assert!(edge.points.is_some());
        assert_eq!(dump.group.as_ref().map(|g| g.nodes.len()), Some(2));

        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["direction"], "TB");
        assert!(json["edges"][0]["sourceSide"].is_string());
    }

    #[test]
    fn direction_is_written_as_its_token() {
        let config = LayoutConfig {
            direction: Direction::RightLeft,
            ..LayoutConfig::default()
        };
        let dump = LayoutDump::from_layout(&Layout::empty(), &config);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["direction"], "RL");
    }

    #[test]
    fn group_children_carry_frame_relative_offsets() {
        let resources = vec![
            ResourceSummary::new("dev", ResourceType::Devbox).with_ports(&[22]),
            ResourceSummary::new("api", ResourceType::Deployment),
        ];
        let config = LayoutConfig::default();
        let layout = layout_resources(&resources, &config).unwrap();
        let dump = LayoutDump::from_layout(&layout, &config);
        let frame = layout.group.as_ref().unwrap();

        let dev = dump.nodes.iter().find(|n| n.id == "devbox-dev").unwrap();
        let relative = dev.relative.unwrap();
        assert!((relative.x - (dev.x - frame.x)).abs() < 1e-3);
        assert!((relative.y - (dev.y - frame.y)).abs() < 1e-3);
        assert!(relative.x >= 0.0 && relative.y >= 0.0);

        let api = dump.nodes.iter().find(|n| n.id == "deployment-api").unwrap();
        assert!(api.relative.is_none());
        let json = serde_json::to_value(api).unwrap();
        assert!(json.get("relative").is_none());
    }
}
