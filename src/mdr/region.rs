//! Data Region Detection
//!
//! For every parent, finds maximal runs of adjacent, mutually similar
//! generalized nodes (blocks of `g` siblings), then lifts regions found
//! deeper in the tree up to each ancestor whose own regions do not cover
//! them.
//!
//! Best-candidate policy within one search range: larger `node_count`
//! wins, ties go to the earlier `start`, further ties to the smaller `g`.
//! Once a region is fixed, the search continues right after it; children
//! before the chosen region are not revisited.

use log::trace;

use super::similarity::StructuralSimilarity;
use crate::dom::{NodeId, TagTree};

/// A run of similar generalized nodes under one parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRegion {
    /// Node whose children the indices refer to
    pub parent: NodeId,
    /// Siblings per generalized node (`g`)
    pub gn_size: usize,
    /// Index of the first covered child
    pub start: usize,
    /// Number of covered children, a multiple of `gn_size`
    pub node_count: usize,
}

impl DataRegion {
    /// Index one past the last covered child
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.node_count
    }

    #[inline]
    pub fn covers(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }

    /// Number of generalized nodes in the region
    #[inline]
    pub fn gn_count(&self) -> usize {
        self.node_count / self.gn_size
    }

    /// Generalized nodes as slices of the parent's children
    pub fn generalized_nodes<'a>(&self, tree: &'a TagTree) -> std::slice::Chunks<'a, NodeId> {
        tree.children(self.parent)[self.start..self.end()].chunks(self.gn_size)
    }

    /// Last generalized node
    pub fn last_gn<'a>(&self, tree: &'a TagTree) -> &'a [NodeId] {
        &tree.children(self.parent)[self.end() - self.gn_size..self.end()]
    }

    /// First generalized node
    pub fn first_gn<'a>(&self, tree: &'a TagTree) -> &'a [NodeId] {
        &tree.children(self.parent)[self.start..self.start + self.gn_size]
    }
}

/// Regions per node, indexed by NodeId
///
/// Each entry holds the node's own regions plus those promoted from
/// uncovered descendants, in document order.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<Vec<DataRegion>>,
}

impl RegionMap {
    /// Regions visible at `id`
    pub fn get(&self, id: NodeId) -> &[DataRegion] {
        self.regions.get(id as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every region of the document, in document order
    pub fn document_regions(&self) -> &[DataRegion] {
        self.get(TagTree::DOCUMENT)
    }

    /// Nodes with at least one region
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[DataRegion])> + '_ {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_empty())
            .map(|(id, r)| (id as NodeId, r.as_slice()))
    }

    /// Number of nodes with at least one region
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(Vec::is_empty)
    }
}

/// True when `id` can hold a region: two or more children, one with children
#[inline]
pub fn is_candidate(tree: &TagTree, id: NodeId) -> bool {
    tree.children(id).len() >= 2 && tree.has_grandchildren(id)
}

/// Regions among the children of `parent` alone (no promotion)
pub fn identify_regions(
    sim: &mut StructuralSimilarity<'_>,
    parent: NodeId,
    max_gn_size: usize,
    threshold: f64,
) -> Vec<DataRegion> {
    let tree = sim.tree();
    let mut regions = Vec::new();
    if !is_candidate(tree, parent) {
        return regions;
    }

    let hi = tree.children(parent).len();
    let mut origin = 0;
    while let Some(best) = best_region_in(sim, parent, origin, hi, max_gn_size, threshold) {
        origin = best.end();
        regions.push(best);
    }

    trace!("node {}: {} own region(s)", parent, regions.len());
    regions
}

/// Best region whose windows all lie in `children[lo..hi)`
fn best_region_in(
    sim: &mut StructuralSimilarity<'_>,
    parent: NodeId,
    lo: usize,
    hi: usize,
    max_gn_size: usize,
    threshold: f64,
) -> Option<DataRegion> {
    let tree = sim.tree();
    let children = tree.children(parent);
    let mut best: Option<DataRegion> = None;

    for g in 1..=max_gn_size {
        if lo + 2 * g > hi {
            break;
        }
        for f in lo..lo + g {
            let mut current: Option<DataRegion> = None;
            let mut j = f;
            while j + 2 * g <= hi {
                let left = &children[j..j + g];
                let right = &children[j + g..j + 2 * g];
                if windows_match(sim, left, right, threshold) {
                    match current.as_mut() {
                        Some(region) => region.node_count += g,
                        None => {
                            current = Some(DataRegion {
                                parent,
                                gn_size: g,
                                start: j,
                                node_count: 2 * g,
                            })
                        }
                    }
                } else if current.is_some() {
                    break;
                }
                j += g;
            }

            if let Some(candidate) = current {
                if is_better(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
    }

    best
}

/// Text-only windows never open or extend a region
fn windows_match(
    sim: &mut StructuralSimilarity<'_>,
    left: &[NodeId],
    right: &[NodeId],
    threshold: f64,
) -> bool {
    let tree = sim.tree();
    let has_element = |w: &[NodeId]| w.iter().any(|&id| !tree.is_text(id));
    has_element(left) && has_element(right) && sim.similar(left, right, threshold)
}

/// Candidates are visited by increasing `g`, so keeping the incumbent on a
/// full tie already prefers the smaller generalized node.
fn is_better(candidate: &DataRegion, best: Option<&DataRegion>) -> bool {
    match best {
        None => true,
        Some(best) => {
            candidate.node_count > best.node_count
                || (candidate.node_count == best.node_count && candidate.start < best.start)
        }
    }
}

/// Combine per-node regions into a `RegionMap`
///
/// `own[id]` holds the regions among `id`'s children. Arena ids grow in
/// document order, so walking them in reverse finishes every child before
/// its parent.
pub fn promote(tree: &TagTree, mut own: Vec<Vec<DataRegion>>) -> RegionMap {
    let n = tree.node_count();
    own.resize(n, Vec::new());
    let mut visible: Vec<Vec<DataRegion>> = vec![Vec::new(); n];

    for id in (0..n).rev() {
        let own_regions = std::mem::take(&mut own[id]);
        let children = tree.children(id as NodeId);
        let mut merged = Vec::with_capacity(own_regions.len());
        let mut pending = own_regions.iter().copied().peekable();

        for (index, &child) in children.iter().enumerate() {
            while let Some(region) = pending.next_if(|r| r.start == index) {
                merged.push(region);
            }
            if !own_regions.iter().any(|r| r.covers(index)) {
                merged.extend_from_slice(&visible[child as usize]);
            }
        }
        merged.extend(pending);

        visible[id] = merged;
    }

    RegionMap { regions: visible }
}

/// Detect regions over the whole tree, sequentially
pub fn detect_regions(
    sim: &mut StructuralSimilarity<'_>,
    max_gn_size: usize,
    threshold: f64,
) -> RegionMap {
    let tree = sim.tree();
    let own: Vec<Vec<DataRegion>> = (0..tree.node_count() as NodeId)
        .map(|id| identify_regions(sim, id, max_gn_size, threshold))
        .collect();
    promote(tree, own)
}
