/* src/hierarchy.rs */

use crate::expansion::ExpansionState;
use crate::storage::ZoneDirectory;
use crate::zone::{Zone, normalize_name, validate_fqdn};
use fancy_log::{LogLevel, log};
use serde::Serialize;
use std::collections::HashMap;

/// Zones with this many labels or fewer are never subdomains, and suffixes
/// shorter than this are never tried as ancestors.
const MIN_PARENT_LABELS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// Labels dropped from this zone's name to reach its parent. 0 for roots.
    pub depth: usize,
    pub child_count: usize,
    /// Parent hops up to a root.
    pub level: usize,
}

/// Per-zone row handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneViewModel {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub child_count: usize,
    pub level: usize,
    pub is_expanded: bool,
    pub is_visible: bool,
}

/// Parent/child relationships derived from a flat zone list.
///
/// Always rebuilt from a whole snapshot; there is no incremental update.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    by_id: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
}

impl Hierarchy {
    pub fn from_directory(directory: &impl ZoneDirectory) -> Self {
        Self::build(directory.get_all())
    }

    /// Resolves every zone's nearest existing ancestor.
    pub fn build(zones: &[Zone]) -> Self {
        // Normalized name -> index of the zone allowed to act as a parent.
        let mut placed: HashMap<String, usize> = HashMap::with_capacity(zones.len());
        let mut normalized: Vec<Option<String>> = Vec::with_capacity(zones.len());

        for (idx, zone) in zones.iter().enumerate() {
            match validate_fqdn(&zone.name) {
                Ok(name) if placed.contains_key(&name) => {
                    log(
                        LogLevel::Warn,
                        &format!(
                            "Duplicate zone name {:?}, leaving it out of the hierarchy.",
                            zone.name
                        ),
                    );
                    normalized.push(None);
                }
                Ok(name) => {
                    placed.insert(name.clone(), idx);
                    normalized.push(Some(name));
                }
                Err(e) => {
                    log(
                        LogLevel::Warn,
                        &format!("Excluding zone {:?} from the hierarchy: {}", zone.id, e),
                    );
                    normalized.push(None);
                }
            }
        }

        let mut parents: Vec<Option<usize>> = vec![None; zones.len()];
        let mut depths = vec![0usize; zones.len()];
        for (idx, name) in normalized.iter().enumerate() {
            let Some(name) = name else { continue };
            if let Some((parent, dropped)) = nearest_ancestor(name, &placed) {
                parents[idx] = Some(parent);
                depths[idx] = dropped;
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); zones.len()];
        for (idx, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(idx);
            }
        }
        for list in &mut children {
            list.sort_by_cached_key(|idx| normalize_name(&zones[*idx].name));
        }

        let nodes = zones
            .iter()
            .enumerate()
            .map(|(idx, zone)| HierarchyNode {
                id: zone.id.clone(),
                name: zone.name.clone(),
                parent_id: parents[idx].map(|p| zones[p].id.clone()),
                depth: depths[idx],
                child_count: children[idx].len(),
                level: level_of(idx, &parents),
            })
            .collect::<Vec<_>>();

        let mut by_id = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            by_id.entry(node.id.clone()).or_insert(idx);
        }

        Hierarchy {
            nodes,
            by_id,
            children,
            parents,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in input order.
    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&HierarchyNode> {
        self.by_id.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn parent_of(&self, id: &str) -> Option<&HierarchyNode> {
        let idx = *self.by_id.get(id)?;
        self.parents[idx].map(|p| &self.nodes[p])
    }

    pub fn children_of(&self, id: &str) -> Vec<&HierarchyNode> {
        match self.by_id.get(id) {
            Some(&idx) => self.children[idx].iter().map(|&c| &self.nodes[c]).collect(),
            None => Vec::new(),
        }
    }

    pub fn roots(&self) -> Vec<&HierarchyNode> {
        self.root_indices()
            .into_iter()
            .map(|idx| &self.nodes[idx])
            .collect()
    }

    /// Depth-first order: every parent directly before its subtree, siblings by name.
    pub fn ordered(&self) -> Vec<&HierarchyNode> {
        self.preorder().into_iter().map(|idx| &self.nodes[idx]).collect()
    }

    /// Builds display rows. A row is visible when every ancestor is expanded.
    pub fn view(&self, expansion: &ExpansionState) -> Vec<ZoneViewModel> {
        let mut visible = vec![false; self.nodes.len()];
        let mut rows = Vec::with_capacity(self.nodes.len());

        for idx in self.preorder() {
            let node = &self.nodes[idx];
            let is_visible = match self.parents[idx] {
                None => true,
                Some(p) => visible[p] && expansion.get(&self.nodes[p].id),
            };
            visible[idx] = is_visible;
            rows.push(ZoneViewModel {
                id: node.id.clone(),
                name: node.name.clone(),
                parent_id: node.parent_id.clone(),
                depth: node.depth,
                child_count: node.child_count,
                level: node.level,
                is_expanded: expansion.get(&node.id),
                is_visible,
            });
        }
        rows
    }

    /// Ids of every zone that has at least one child.
    pub fn parent_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.child_count > 0)
            .map(|n| n.id.clone())
            .collect()
    }

    fn root_indices(&self) -> Vec<usize> {
        let mut roots: Vec<usize> = (0..self.nodes.len())
            .filter(|idx| self.parents[*idx].is_none())
            .collect();
        roots.sort_by_cached_key(|idx| normalize_name(&self.nodes[*idx].name));
        roots
    }

    fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.root_indices().into_iter().rev().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.children[idx].iter().rev());
        }
        order
    }
}

/// Proper suffixes of a normalized name that may be its ancestor, most
/// specific first, paired with the number of labels dropped.
pub fn ancestor_candidates(normalized: &str) -> impl Iterator<Item = (usize, String)> + '_ {
    let labels: Vec<&str> = normalized.split('.').collect();
    let max_dropped = labels.len().saturating_sub(MIN_PARENT_LABELS);
    (1..=max_dropped).map(move |dropped| (dropped, labels[dropped..].join(".")))
}

/// The first candidate suffix present in `placed` wins.
fn nearest_ancestor(name: &str, placed: &HashMap<String, usize>) -> Option<(usize, usize)> {
    ancestor_candidates(name)
        .find_map(|(dropped, candidate)| placed.get(&candidate).map(|&parent| (parent, dropped)))
}

fn level_of(mut idx: usize, parents: &[Option<usize>]) -> usize {
    let mut level = 0;
    while let Some(parent) = parents[idx] {
        level += 1;
        idx = parent;
    }
    level
}
