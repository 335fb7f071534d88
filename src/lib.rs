#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod graph;
pub mod grouping;
pub mod inference;
pub mod ir;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{ConfigError, LayoutConfig, SplitLayoutConfig, load_config, parse_config};
pub use graph::{GraphError, build_graph};
pub use grouping::apply_grouping;
pub use inference::{ReliancesMap, infer_reliances};
pub use layout::{
    Layout, LayoutError, SizeResolver, compute_layout, compute_layout_with_sizes,
    edge_geometries, floating_edge, layout_resources,
};
