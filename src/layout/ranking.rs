use std::collections::{HashMap, HashSet};

use crate::ir::{GraphEdge, GraphNode, NodeKind};

/// Tier a node kind belongs to before overcrowded tiers are split.
pub(super) fn base_tier(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Database | NodeKind::Storage => 0,
        NodeKind::Workload | NodeKind::Group | NodeKind::Unknown => 1,
        NodeKind::Network => 2,
    }
}

const TIER_COUNT: usize = 3;

/// Bucket `nodes` into ranks.
///
/// Each tier keeps at least one rank so workloads stay on rank 1 even without
/// databases. A tier holding more than `max_per_rank` nodes spills into extra
/// ranks right after its base rank, pushing later tiers down. Tiers are
/// processed network first so a node's children are usually ranked before
/// the node itself is triaged.
pub(super) fn assign_ranks(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    max_per_rank: usize,
) -> Vec<Vec<String>> {
    let max_per_rank = max_per_rank.max(1);
    let present: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if !present.contains(edge.source.as_str()) || !present.contains(edge.target.as_str()) {
            continue;
        }
        let list = children.entry(edge.source.as_str()).or_default();
        if !list.contains(&edge.target.as_str()) {
            list.push(edge.target.as_str());
        }
    }

    let mut tiers: [Vec<&str>; TIER_COUNT] = Default::default();
    let mut seen: HashSet<&str> = HashSet::new();
    for node in nodes {
        if seen.insert(node.id.as_str()) {
            tiers[base_tier(node.kind)].push(node.id.as_str());
        }
    }

    let mut ranked: HashSet<&str> = HashSet::new();
    let mut tier_rows: [Vec<Vec<String>>; TIER_COUNT] = Default::default();
    for tier in (0..TIER_COUNT).rev() {
        let members = &tiers[tier];
        let rows = if members.len() <= max_per_rank {
            vec![members.iter().map(|id| id.to_string()).collect()]
        } else if tier == base_tier(NodeKind::Network) {
            pack_rows(members.iter().copied(), max_per_rank)
        } else {
            let ordered = triage_overcrowded(members, &children, &ranked);
            pack_rows(ordered.into_iter(), max_per_rank)
        };
        if rows.len() > 1 {
            tracing::debug!(
                tier,
                nodes = members.len(),
                ranks = rows.len(),
                "split overcrowded rank"
            );
        }
        ranked.extend(members.iter().copied());
        tier_rows[tier] = rows;
    }

    tier_rows.into_iter().flatten().collect()
}

/// Order an overcrowded tier so the nodes that stay on the base rank come
/// first: ready nodes by ascending child count, then nodes still waiting on
/// unranked children.
fn triage_overcrowded<'a>(
    members: &[&'a str],
    children: &HashMap<&str, Vec<&str>>,
    ranked: &HashSet<&str>,
) -> Vec<&'a str> {
    let child_count = |id: &str| children.get(id).map_or(0, Vec::len);
    let (mut ready, deferred): (Vec<&str>, Vec<&str>) = members.iter().copied().partition(|id| {
        children
            .get(*id)
            .is_none_or(|list| list.iter().all(|child| ranked.contains(child)))
    });
    ready.sort_by_key(|id| child_count(id));
    ready.into_iter().chain(deferred).collect()
}

fn pack_rows<'a>(ids: impl Iterator<Item = &'a str>, max_per_rank: usize) -> Vec<Vec<String>> {
    let ids: Vec<String> = ids.map(str::to_string).collect();
    ids.chunks(max_per_rank).map(<[String]>::to_vec).collect()
}

/// Barycenter crossing reduction over `passes` iterations.
///
/// A top-down sweep sorts each rank by the mean index of the node's parents
/// in earlier ranks; a bottom-up sweep does the same with children in later
/// ranks. Nodes without positioned neighbours sort last and ties keep the
/// prior order. A sweep that would increase the crossing count is dropped,
/// so the result never has more crossings than the input order.
pub(super) fn order_rank_nodes(rank_nodes: &mut [Vec<String>], edges: &[GraphEdge], passes: usize) {
    if rank_nodes.len() <= 1 || passes == 0 {
        return;
    }
    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
        incoming
            .entry(edge.target.clone())
            .or_default()
            .push(edge.source.clone());
    }

    let mut crossings = count_crossings(rank_nodes, edges);
    for _ in 0..passes {
        for downward in [true, false] {
            if crossings == 0 {
                return;
            }
            let mut candidate = rank_nodes.to_vec();
            if downward {
                for rank in 1..candidate.len() {
                    sort_by_barycenter(&mut candidate, rank, &incoming, |r| r < rank);
                }
            } else {
                for rank in (0..candidate.len().saturating_sub(1)).rev() {
                    sort_by_barycenter(&mut candidate, rank, &outgoing, |r| r > rank);
                }
            }
            let after = count_crossings(&candidate, edges);
            if after <= crossings {
                rank_nodes.clone_from_slice(&candidate);
                crossings = after;
            }
        }
    }
}

fn sort_by_barycenter(
    rank_nodes: &mut [Vec<String>],
    rank: usize,
    neighbors: &HashMap<String, Vec<String>>,
    positioned: impl Fn(usize) -> bool,
) {
    if rank_nodes[rank].len() <= 1 {
        return;
    }
    let mut keyed: Vec<(Option<f32>, usize, String)> = {
        let positions = positions_of(rank_nodes);
        rank_nodes[rank]
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let score = barycenter(id, neighbors, &positions, &positioned);
                (score, idx, id.clone())
            })
            .collect()
    };
    keyed.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.total_cmp(&y).then(a.1.cmp(&b.1)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });
    rank_nodes[rank] = keyed.into_iter().map(|(_, _, id)| id).collect();
}

fn barycenter(
    node_id: &str,
    neighbors: &HashMap<String, Vec<String>>,
    positions: &HashMap<&str, (usize, usize)>,
    positioned: &impl Fn(usize) -> bool,
) -> Option<f32> {
    let list = neighbors.get(node_id)?;
    let mut total = 0.0f32;
    let mut count = 0usize;
    for neighbor in list {
        if let Some(&(rank, idx)) = positions.get(neighbor.as_str()) {
            if positioned(rank) {
                total += idx as f32;
                count += 1;
            }
        }
    }
    (count > 0).then(|| total / count as f32)
}

fn positions_of(rank_nodes: &[Vec<String>]) -> HashMap<&str, (usize, usize)> {
    let mut positions = HashMap::new();
    for (rank, bucket) in rank_nodes.iter().enumerate() {
        for (idx, id) in bucket.iter().enumerate() {
            positions.insert(id.as_str(), (rank, idx));
        }
    }
    positions
}

/// Crossings between edges that span the same pair of ranks. Edges inside a
/// single rank are ignored.
pub(super) fn count_crossings(rank_nodes: &[Vec<String>], edges: &[GraphEdge]) -> usize {
    let positions = positions_of(rank_nodes);
    let mut spans: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for edge in edges {
        let (Some(&(ra, ia)), Some(&(rb, ib))) = (
            positions.get(edge.source.as_str()),
            positions.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if ra == rb {
            continue;
        }
        let (upper, lower) = if ra < rb {
            ((ra, ia), (rb, ib))
        } else {
            ((rb, ib), (ra, ia))
        };
        spans
            .entry((upper.0, lower.0))
            .or_default()
            .push((upper.1, lower.1));
    }

    let mut total = 0usize;
    for list in spans.values() {
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                let du = a.0 as isize - b.0 as isize;
                let dl = a.1 as isize - b.1 as isize;
                if du * dl < 0 {
                    total += 1;
                }
            }
        }
    }
    total
}
