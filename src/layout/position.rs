use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::ir::{Position, Size};

/// Turn ordered rank buckets into top-left positions.
///
/// The primary axis stacks ranks: each rank band is as deep as its largest
/// node and bands are `rank_spacing` apart; empty ranks take no space. Nodes
/// are centered inside their band. The cross axis lays each rank out
/// contiguously, `node_spacing` apart, centered on 0. Mirrored directions
/// flip the primary axis so rank 0 ends up at the bottom/right.
pub(super) fn assign_positions(
    rank_nodes: &[Vec<String>],
    sizes: &HashMap<String, Size>,
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    let horizontal = config.direction.is_horizontal();
    let fallback = config.default_size();
    let size_of = |id: &str| sizes.get(id).copied().unwrap_or(fallback);
    let main_extent = |size: Size| if horizontal { size.width } else { size.height };
    let cross_extent = |size: Size| if horizontal { size.height } else { size.width };

    let mut bands: Vec<(f32, f32, &[String])> = Vec::new();
    let mut cursor = 0.0f32;
    for bucket in rank_nodes.iter().filter(|bucket| !bucket.is_empty()) {
        let extent = bucket
            .iter()
            .map(|id| main_extent(size_of(id)))
            .fold(0.0f32, f32::max);
        bands.push((cursor, extent, bucket.as_slice()));
        cursor += extent + config.rank_spacing;
    }
    let total = (cursor - config.rank_spacing).max(0.0);

    let mut positions = HashMap::new();
    for (offset, extent, bucket) in bands {
        let band_start = if config.direction.is_mirrored() {
            total - offset - extent
        } else {
            offset
        };
        let row_len = bucket
            .iter()
            .map(|id| cross_extent(size_of(id)))
            .sum::<f32>()
            + config.node_spacing * (bucket.len().saturating_sub(1)) as f32;

        let mut cross = -row_len / 2.0;
        for id in bucket {
            let size = size_of(id);
            let main = band_start + (extent - main_extent(size)) / 2.0;
            let position = if horizontal {
                Position::new(main, cross)
            } else {
                Position::new(cross, main)
            };
            positions.insert(id.clone(), position);
            cross += cross_extent(size) + config.node_spacing;
        }
    }
    positions
}
