use serde::Deserialize;
use topology_layout::config::LayoutConfig;
use topology_layout::ir::{Direction, ResourceSummary};
use topology_layout::layout::layout_resources;
use wasm_bindgen::prelude::*;

/// Options accepted from the rendering host. Everything is optional; a full
/// `layout` block replaces the defaults before the shorthands are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopologyLayoutOptions {
    layout: Option<LayoutConfig>,
    direction: Option<Direction>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    group_resource_type: Option<topology_layout::ir::ResourceType>,
}

fn build_layout_config(options: TopologyLayoutOptions) -> LayoutConfig {
    let mut config = options.layout.unwrap_or_default();
    if let Some(direction) = options.direction {
        config.direction = direction;
    }
    if let Some(width) = options.node_width {
        config.node_width = width;
    }
    if let Some(height) = options.node_height {
        config.node_height = height;
    }
    if let Some(resource_type) = options.group_resource_type {
        config.split.group_resource_type = resource_type;
    }
    config
}

fn layout_json(resources_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<TopologyLayoutOptions>(raw)
            .map_err(|error| error.to_string())?,
        None => TopologyLayoutOptions::default(),
    };
    let config = build_layout_config(options);
    let resources: Vec<ResourceSummary> =
        serde_json::from_str(resources_json).map_err(|error| error.to_string())?;
    let layout = layout_resources(&resources, &config).map_err(|error| error.to_string())?;
    serde_json::to_string(&layout).map_err(|error| error.to_string())
}

#[wasm_bindgen]
pub fn layout_topology(
    resources_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    layout_json(resources_json, options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}
