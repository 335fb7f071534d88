use crate::ir::{Direction, Position, ResourceType, Size};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{field}` must be a finite number greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f32 },
    #[error("`{field}` must be a finite, non-negative number (got {value})")]
    Negative { field: &'static str, value: f32 },
    #[error("`{field}` must be finite")]
    NotFinite { field: &'static str },
    #[error("`maxNodesPerRank` must be at least 1")]
    EmptyRank,
    #[error("`split.groupId` must not be empty")]
    EmptyGroupId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitLayoutConfig {
    /// Id of the synthetic group node.
    pub group_id: String,
    /// Resource subtype that runs inside the group frame.
    pub group_resource_type: ResourceType,
    pub group_padding: f32,
    pub gap_between_group_and_rest: f32,
    /// Top-left corner of the group frame.
    pub group_position: Position,
    pub edge_clearance: f32,
    pub auto_resize_group: bool,
    /// Frame size used when `auto_resize_group` is off.
    pub group_size: Size,
    /// Vertical gap between the frame and the row of group-only databases.
    pub gap_below_group: f32,
}

impl Default for SplitLayoutConfig {
    fn default() -> Self {
        Self {
            group_id: "devbox-group".to_string(),
            group_resource_type: ResourceType::Devbox,
            group_padding: 40.0,
            gap_between_group_and_rest: 200.0,
            group_position: Position::default(),
            edge_clearance: 20.0,
            auto_resize_group: true,
            group_size: Size::new(640.0, 420.0),
            gap_below_group: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub node_width: f32,
    pub node_height: f32,
    pub rank_spacing: f32,
    pub node_spacing: f32,
    /// Run the barycenter crossing-reduction sweeps.
    pub edge_aware: bool,
    pub barycentric_iterations: usize,
    pub max_nodes_per_rank: usize,
    /// Minimum horizontal gap between aligned network nodes.
    pub alignment_spacing: f32,
    pub split: SplitLayoutConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_width: 200.0,
            node_height: 80.0,
            rank_spacing: 100.0,
            node_spacing: 60.0,
            edge_aware: true,
            barycentric_iterations: 3,
            max_nodes_per_rank: 6,
            alignment_spacing: 20.0,
            split: SplitLayoutConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn default_size(&self) -> Size {
        Size::new(self.node_width, self.node_height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("nodeWidth", self.node_width)?;
        positive("nodeHeight", self.node_height)?;
        positive("rankSpacing", self.rank_spacing)?;
        positive("nodeSpacing", self.node_spacing)?;
        non_negative("alignmentSpacing", self.alignment_spacing)?;
        if self.max_nodes_per_rank == 0 {
            return Err(ConfigError::EmptyRank);
        }

        let split = &self.split;
        if split.group_id.trim().is_empty() {
            return Err(ConfigError::EmptyGroupId);
        }
        non_negative("split.groupPadding", split.group_padding)?;
        non_negative("split.edgeClearance", split.edge_clearance)?;
        positive(
            "split.gapBetweenGroupAndRest",
            split.gap_between_group_and_rest,
        )?;
        positive("split.gapBelowGroup", split.gap_below_group)?;
        if !split.auto_resize_group {
            positive("split.groupSize.width", split.group_size.width)?;
            positive("split.groupSize.height", split.group_size.height)?;
        }
        if !split.group_position.x.is_finite() || !split.group_position.y.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "split.groupPosition",
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Load a JSON or JSON5 layout config over the defaults. `None` yields the
/// defaults untouched.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    tracing::debug!(path = %path.display(), "loaded layout config");
    Ok(config)
}

pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let config: LayoutConfig = if contents.trim().is_empty() {
        LayoutConfig::default()
    } else {
        json5::from_str(contents)?
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_and_negative_separations() {
        let config = LayoutConfig {
            rank_spacing: 0.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "rankSpacing",
                ..
            })
        ));

        let mut config = LayoutConfig::default();
        config.split.group_padding = -4.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { .. })
        ));

        let config = LayoutConfig {
            node_width: f32::NAN,
            ..LayoutConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn fixed_group_size_is_checked_only_without_auto_resize() {
        let mut config = LayoutConfig::default();
        config.split.group_size = Size::new(0.0, 0.0);
        assert!(config.validate().is_ok());
        config.split.auto_resize_group = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_json5_over_defaults() {
        let config = parse_config(
            r#"{
                // comments are allowed
                direction: "LR",
                nodeSpacing: 24,
                split: { gapBetweenGroupAndRest: 150 },
            }"#,
        )
        .unwrap();
        assert_eq!(config.direction, Direction::LeftRight);
        assert_eq!(config.node_spacing, 24.0);
        assert_eq!(config.split.gap_between_group_and_rest, 150.0);
        assert_eq!(config.split.group_padding, 40.0);
        assert_eq!(config.node_width, 200.0);
    }

    #[test]
    fn parse_rejects_invalid_values() {
        assert!(parse_config(r#"{"maxNodesPerRank": 0}"#).is_err());
        assert!(parse_config(r#"{"split": {"groupId": " "}}"#).is_err());
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, LayoutConfig::default());
    }
}
