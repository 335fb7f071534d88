//! Dependency inference from configuration signals.
//!
//! Two independent heuristics look for mentions of one resource inside
//! another's configuration:
//!
//! * environment entries whose value (or referenced secret / config map name)
//!   contains another resource's name, longest match wins;
//! * container images whose final path segment names another resource,
//!   matched on word boundaries so `app` never matches `myapp`.
//!
//! Both produce a [`ReliancesMap`]; [`infer_reliances`] merges them.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ir::{ResourceRef, ResourceSummary, ResourceType};

/// `name[:tag][@digest]` -> `name`
static IMAGE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<name>[^:@]+)").expect("image name pattern is valid"));

/// Owner type -> owner name -> resources the owner relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReliancesMap(BTreeMap<ResourceType, BTreeMap<String, Vec<ResourceRef>>>);

impl ReliancesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `owner` relies on `dependency`. Duplicates are ignored and
    /// first-seen order is kept.
    pub fn insert(&mut self, owner: &ResourceRef, dependency: ResourceRef) {
        let list = self
            .0
            .entry(owner.resource_type)
            .or_default()
            .entry(owner.name.clone())
            .or_default();
        if !list.contains(&dependency) {
            list.push(dependency);
        }
    }

    pub fn get(&self, resource_type: ResourceType, name: &str) -> &[ResourceRef] {
        self.0
            .get(&resource_type)
            .and_then(|by_name| by_name.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Array-union merge keyed on `(resourceType, name)`.
    pub fn merge(mut self, other: ReliancesMap) -> ReliancesMap {
        for (resource_type, by_name) in other.0 {
            for (name, deps) in by_name {
                let owner = ResourceRef {
                    name,
                    resource_type,
                };
                for dep in deps {
                    self.insert(&owner, dep);
                }
            }
        }
        self
    }

    /// `(owner, dependency)` pairs in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceRef, &ResourceRef)> {
        self.0.iter().flat_map(|(resource_type, by_name)| {
            by_name.iter().flat_map(move |(name, deps)| {
                deps.iter().map(move |dep| {
                    (
                        ResourceRef {
                            name: name.clone(),
                            resource_type: *resource_type,
                        },
                        dep,
                    )
                })
            })
        })
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|by_name| by_name.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run both heuristics and merge their results.
pub fn infer_reliances(resources: &[ResourceSummary]) -> ReliancesMap {
    let env = infer_from_env(resources);
    let image = infer_from_image(resources);
    let merged = env.merge(image);
    tracing::debug!(
        resources = resources.len(),
        reliances = merged.len(),
        "inferred reliances"
    );
    merged
}

pub fn infer_from_env(resources: &[ResourceSummary]) -> ReliancesMap {
    let candidates: Vec<(String, &ResourceSummary)> = resources
        .iter()
        .filter(|res| !res.name.trim().is_empty())
        .map(|res| (res.name.to_lowercase(), res))
        .collect();

    let mut map = ReliancesMap::new();
    for owner in resources {
        if !owner.resource_type.is_workload() {
            continue;
        }
        let owner_ref = owner.resource_ref();
        for entry in &owner.env {
            let mut best: Option<(usize, &ResourceSummary)> = None;
            for signal in entry.signals() {
                let signal = signal.to_lowercase();
                for (name, candidate) in &candidates {
                    if is_same_resource(owner, candidate) || !signal.contains(name.as_str()) {
                        continue;
                    }
                    if best.is_none_or(|(len, _)| name.len() > len) {
                        best = Some((name.len(), *candidate));
                    }
                }
            }
            if let Some((_, dep)) = best {
                tracing::trace!(
                    owner = %owner.name,
                    env = %entry.name,
                    dependency = %dep.name,
                    "env reliance"
                );
                map.insert(&owner_ref, dep.resource_ref());
            }
        }
    }
    map
}

pub fn infer_from_image(resources: &[ResourceSummary]) -> ReliancesMap {
    let mut map = ReliancesMap::new();
    for owner in resources {
        if !owner.resource_type.is_workload() {
            continue;
        }
        let Some(tail) = owner.image.as_deref().and_then(image_tail) else {
            continue;
        };
        let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(&tail))) else {
            continue;
        };

        let others = || {
            resources
                .iter()
                .filter(|candidate| !is_same_resource(owner, candidate))
                .filter(|candidate| !candidate.name.trim().is_empty())
        };
        let exact = others().find(|candidate| candidate.name.to_lowercase() == tail);
        let found = exact.or_else(|| {
            others().find(|candidate| pattern.is_match(&candidate.name.to_lowercase()))
        });
        if let Some(dep) = found {
            tracing::trace!(
                owner = %owner.name,
                image = %tail,
                dependency = %dep.name,
                "image reliance"
            );
            map.insert(&owner.resource_ref(), dep.resource_ref());
        }
    }
    map
}

/// Final path segment of an image reference with registry, tag and digest
/// removed, lowercased. `None` for blank references.
pub fn image_tail(image: &str) -> Option<String> {
    let last = image.trim().rsplit('/').next()?;
    let name = IMAGE_NAME_RE.captures(last)?.name("name")?.as_str().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

fn is_same_resource(a: &ResourceSummary, b: &ResourceSummary) -> bool {
    a.resource_type == b.resource_type && a.name == b.name
}
