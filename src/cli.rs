use crate::config::{LayoutConfig, load_config};
use crate::graph::build_graph;
use crate::grouping::apply_grouping;
use crate::inference::{ReliancesMap, infer_reliances};
use crate::ir::{Direction, ResourceSummary};
use crate::layout::compute_layout;
use crate::layout_dump::{print_layout_dump, write_layout_dump};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "topolay",
    version,
    about = "Deterministic layout for cloud-resource topology diagrams"
)]
pub struct Args {
    /// Resource summaries (JSON array) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Layout dump output (JSON). Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout options file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Override the layout direction (TB, BT, LR, RL)
    #[arg(short = 'd', long = "direction", value_parser = parse_direction)]
    pub direction: Option<Direction>,

    /// Skip dependency inference; only ports produce edges
    #[arg(long = "no-inference")]
    pub no_inference: bool,
}

fn parse_direction(token: &str) -> std::result::Result<Direction, String> {
    Direction::from_token(&token.to_ascii_uppercase())
        .ok_or_else(|| format!("unknown direction '{token}', expected TB, BT, LR or RL"))
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(direction) = args.direction {
        config.direction = direction;
    }

    let input = read_input(args.input.as_deref())?;
    let resources = parse_resources(&input)?;
    let layout = layout_from_args(&resources, &config, args.no_inference)?;

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout, &config)
            .with_context(|| format!("failed to write {}", path.display())),
        None => print_layout_dump(&layout, &config),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded in another binary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn layout_from_args(
    resources: &[ResourceSummary],
    config: &LayoutConfig,
    no_inference: bool,
) -> Result<crate::layout::Layout> {
    config.validate()?;
    let reliances = if no_inference {
        ReliancesMap::new()
    } else {
        infer_reliances(resources)
    };
    let graph = build_graph(resources, &reliances, config)?;
    let graph = apply_grouping(&graph, config)?;
    Ok(compute_layout(&graph, config)?)
}

fn parse_resources(input: &str) -> Result<Vec<ResourceSummary>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("input is not a JSON array of resource summaries")
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direction_tokens_case_insensitively() {
        assert_eq!(parse_direction("lr"), Ok(Direction::LeftRight));
        assert_eq!(parse_direction("TD"), Ok(Direction::TopBottom));
        assert!(parse_direction("diagonal").is_err());
    }

    #[test]
    fn parses_args() {
        let args = Args::try_parse_from([
            "topolay",
            "-i",
            "resources.json",
            "--direction",
            "RL",
            "--no-inference",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some(Path::new("resources.json")));
        assert_eq!(args.direction, Some(Direction::RightLeft));
        assert!(args.no_inference);
    }

    #[test]
    fn no_inference_leaves_only_port_edges() {
        let input = r#"[
            {"name": "web", "resourceType": "deployment", "ports": [{"port": 80}],
             "env": [{"name": "DB", "value": "postgres://pg-main:5432"}]},
            {"name": "pg-main", "resourceType": "database"}
        ]"#;
        let resources = parse_resources(input).unwrap();
        let config = LayoutConfig::default();

        let inferred = layout_from_args(&resources, &config, false).unwrap();
        assert_eq!(inferred.edges.len(), 2);
        let bare = layout_from_args(&resources, &config, true).unwrap();
        assert_eq!(bare.edges.len(), 1);
        assert_eq!(bare.edges[0].id, "deployment-web-network-deployment-web");
    }

    #[test]
    fn empty_input_is_an_empty_topology() {
        assert!(parse_resources("  \n").unwrap().is_empty());
        assert!(parse_resources("{").is_err());
    }
}
