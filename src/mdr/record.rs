//! Record Identification
//!
//! Turns data regions into data records:
//! - `g == 1`: a node whose children are mutually similar stands for a
//!   list of records (one per child); otherwise the node is the record.
//!   Table rows are never split into cells.
//! - `g > 1`: components with the same number of mutually similar children
//!   are aligned column-wise, one record per child position; otherwise
//!   the whole generalized node is the record.
//! - Two contiguous regions of the same parent and the same `g > 1` whose
//!   boundary blocks differ are emitted as one record set when each aligns
//!   on its own: the union is aligned column-wise across both regions.

use std::slice;

use log::debug;

use super::region::DataRegion;
use super::similarity::StructuralSimilarity;
use crate::dom::{NodeId, TagTree};

/// Tag that is never split into its cells
const TABLE_ROW_TAG: &str = "tr";

/// One logical repeated item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataRecord {
    /// A single structural unit
    Node(NodeId),
    /// Aligned nodes gathered across sibling blocks
    Group(Vec<NodeId>),
}

impl DataRecord {
    /// Constituent nodes in alignment order
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            DataRecord::Node(id) => slice::from_ref(id),
            DataRecord::Group(ids) => ids,
        }
    }

    /// Path identifiers of the record
    ///
    /// Text members of a group with at least one element are left out:
    /// they would only repeat the parent's path.
    pub fn paths(&self, tree: &TagTree) -> Vec<String> {
        let nodes = self.nodes();
        let skip_text = nodes.len() > 1 && nodes.iter().any(|&id| !tree.is_text(id));
        nodes
            .iter()
            .filter(|&&id| !(skip_text && tree.is_text(id)))
            .map(|&id| tree.path(id).to_string())
            .collect()
    }
}

/// Records identified from one region, or from two merged regions
#[derive(Debug, Clone, PartialEq)]
pub struct RecordGroup {
    pub regions: Vec<DataRegion>,
    pub records: Vec<DataRecord>,
}

impl RecordGroup {
    /// Parent shared by every region in the group
    pub fn parent(&self) -> Option<NodeId> {
        self.regions.first().map(|r| r.parent)
    }

    pub fn is_merged(&self) -> bool {
        self.regions.len() > 1
    }
}

/// Identify records for `regions`, which must be in document order
pub fn identify_records(
    sim: &mut StructuralSimilarity<'_>,
    regions: &[DataRegion],
    threshold: f64,
) -> Vec<RecordGroup> {
    let mut groups = Vec::with_capacity(regions.len());
    let mut consumed = vec![false; regions.len()];

    for (i, region) in regions.iter().enumerate() {
        if consumed[i] {
            continue;
        }

        if let Some(next) = regions.get(i + 1) {
            if should_merge(sim, region, next, threshold) {
                debug!(
                    "merging regions at {}..{} and {}..{} of node {}",
                    region.start,
                    region.end(),
                    next.start,
                    next.end(),
                    region.parent
                );
                consumed[i + 1] = true;
                groups.push(RecordGroup {
                    regions: vec![*region, *next],
                    records: merged_records(sim.tree(), &[*region, *next]),
                });
                continue;
            }
        }

        groups.push(RecordGroup {
            regions: vec![*region],
            records: region_records(sim, region, threshold),
        });
    }

    groups
}

/// Records of one region, block by block
fn region_records(
    sim: &mut StructuralSimilarity<'_>,
    region: &DataRegion,
    threshold: f64,
) -> Vec<DataRecord> {
    let tree = sim.tree();
    let mut records = Vec::new();

    for gn in region.generalized_nodes(tree) {
        if region.gn_size == 1 {
            records.extend(single_node_records(sim, gn[0], threshold));
        } else {
            records.extend(multi_node_records(sim, gn, threshold));
        }
    }

    records
}

fn single_node_records(
    sim: &mut StructuralSimilarity<'_>,
    node: NodeId,
    threshold: f64,
) -> Vec<DataRecord> {
    let tree = sim.tree();
    let children = tree.children(node);

    if tree.tag_name(node) != TABLE_ROW_TAG
        && children.len() >= 2
        && splittable(sim, children, threshold)
    {
        children.iter().map(|&c| DataRecord::Node(c)).collect()
    } else {
        vec![DataRecord::Node(node)]
    }
}

fn multi_node_records(
    sim: &mut StructuralSimilarity<'_>,
    gn: &[NodeId],
    threshold: f64,
) -> Vec<DataRecord> {
    match aligned_child_count(sim, gn, threshold) {
        Some(count) => align_children(sim.tree(), gn, count),
        None => vec![DataRecord::Group(gn.to_vec())],
    }
}

/// Child count shared by every component, if the components align
fn aligned_child_count(
    sim: &mut StructuralSimilarity<'_>,
    gn: &[NodeId],
    threshold: f64,
) -> Option<usize> {
    let tree = sim.tree();
    let count = tree.children(*gn.first()?).len();
    if count == 0 {
        return None;
    }

    for &component in gn {
        let children = tree.children(component);
        if children.len() != count || !splittable(sim, children, threshold) {
            return None;
        }
    }

    Some(count)
}

/// Record `i` gathers the `i`-th child of every component
fn align_children(tree: &TagTree, gn: &[NodeId], count: usize) -> Vec<DataRecord> {
    (0..count)
        .map(|i| DataRecord::Group(gn.iter().map(|&c| tree.children(c)[i]).collect()))
        .collect()
}

/// Children may stand as separate records: no text, adjacent pairs similar
fn splittable(sim: &mut StructuralSimilarity<'_>, children: &[NodeId], threshold: f64) -> bool {
    let tree = sim.tree();
    children.iter().all(|&c| !tree.is_text(c)) && sim.chain_similar(children, threshold)
}

/// Child count shared by every block of the region, if all blocks align
fn region_alignment(
    sim: &mut StructuralSimilarity<'_>,
    region: &DataRegion,
    threshold: f64,
) -> Option<usize> {
    let tree = sim.tree();
    let mut shared = None;
    for gn in region.generalized_nodes(tree) {
        let count = aligned_child_count(sim, gn, threshold)?;
        match shared {
            None => shared = Some(count),
            Some(c) if c != count => return None,
            Some(_) => {}
        }
    }
    shared
}

fn should_merge(
    sim: &mut StructuralSimilarity<'_>,
    first: &DataRegion,
    second: &DataRegion,
    threshold: f64,
) -> bool {
    if first.parent != second.parent
        || first.gn_size != second.gn_size
        || first.gn_size < 2
        || first.end() != second.start
    {
        return false;
    }

    let tree = sim.tree();
    if sim.similar(first.last_gn(tree), second.first_gn(tree), threshold) {
        return false;
    }

    region_alignment(sim, first, threshold).is_some()
        && region_alignment(sim, second, threshold).is_some()
}

/// Records spanning merged regions
///
/// Every component of every generalized node in `regions` takes part:
/// record `i` gathers the `i`-th child of each component that has one.
/// The regions may align on different child counts, so later records can
/// hold fewer nodes than the first ones.
fn merged_records(tree: &TagTree, regions: &[DataRegion]) -> Vec<DataRecord> {
    let components: Vec<NodeId> = regions
        .iter()
        .flat_map(|r| tree.children(r.parent)[r.start..r.end()].iter().copied())
        .collect();
    let count = components
        .iter()
        .map(|&c| tree.children(c).len())
        .max()
        .unwrap_or(0);

    (0..count)
        .map(|i| {
            DataRecord::Group(
                components
                    .iter()
                    .filter_map(|&c| tree.children(c).get(i).copied())
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_markup;
    use crate::mdr::region::detect_regions;

    fn identify(markup: &str) -> (TagTree, Vec<RecordGroup>) {
        let tree = parse_markup(markup.as_bytes()).unwrap();
        let groups = {
            let mut sim = StructuralSimilarity::new(&tree, 1024);
            let map = detect_regions(&mut sim, 10, 0.3);
            identify_records(&mut sim, map.document_regions(), 0.3)
        };
        (tree, groups)
    }

    fn all_paths(tree: &TagTree, groups: &[RecordGroup]) -> Vec<Vec<String>> {
        groups
            .iter()
            .flat_map(|g| g.records.iter().map(|r| r.paths(tree)))
            .collect()
    }

    #[test]
    fn test_list_items_are_records() {
        let (tree, groups) = identify("<ul><li>A</li><li>B</li><li>C</li></ul>");
        assert_eq!(
            all_paths(&tree, &groups),
            vec![
                vec!["/ul[1]/li[1]".to_string()],
                vec!["/ul[1]/li[2]".to_string()],
                vec!["/ul[1]/li[3]".to_string()],
            ]
        );
    }

    #[test]
    fn test_table_rows_not_split() {
        let (tree, groups) = identify(
            "<table><tr><td>1</td><td>a</td></tr><tr><td>2</td><td>b</td></tr></table>",
        );
        assert_eq!(
            all_paths(&tree, &groups),
            vec![
                vec!["/table[1]/tr[1]".to_string()],
                vec!["/table[1]/tr[2]".to_string()],
            ]
        );
    }

    #[test]
    fn test_similar_children_split() {
        let (tree, groups) = identify(
            "<div><ul><li><a>1</a></li><li><a>2</a></li></ul><ul><li><a>3</a></li><li><a>4</a></li></ul></div>",
        );
        let paths = all_paths(&tree, &groups);
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], vec!["/div[1]/ul[1]/li[1]".to_string()]);
        assert_eq!(paths[3], vec!["/div[1]/ul[2]/li[2]".to_string()]);
    }

    #[test]
    fn test_dissimilar_children_kept_whole() {
        let (tree, groups) = identify(
            "<div><p><a>1</a><b>x</b></p><p><a>2</a><b>y</b></p></div>",
        );
        assert_eq!(
            all_paths(&tree, &groups),
            vec![vec!["/div[1]/p[1]".to_string()], vec!["/div[1]/p[2]".to_string()]]
        );
    }

    #[test]
    fn test_unaligned_generalized_nodes_kept_whole() {
        let (tree, groups) = identify(
            "<div><h3>a</h3><p>x</p><h3>b</h3><p>y</p><h3>c</h3><p>z</p></div>",
        );
        let paths = all_paths(&tree, &groups);
        assert_eq!(paths.len(), 3);
        assert_eq!(
            paths[1],
            vec!["/div[1]/h3[2]".to_string(), "/div[1]/p[2]".to_string()]
        );
    }

    #[test]
    fn test_generalized_nodes_aligned_by_position() {
        // Names in one row, prices in the next
        let block = "<p><b>n1</b><b>n2</b></p><div><i>p1</i><i>p2</i></div>";
        let (tree, groups) = identify(&format!("<section>{}{}</section>", block, block));
        let paths = all_paths(&tree, &groups);
        assert_eq!(paths.len(), 4);
        assert_eq!(
            paths[0],
            vec!["/section[1]/p[1]/b[1]".to_string(), "/section[1]/div[1]/i[1]".to_string()]
        );
        assert_eq!(
            paths[3],
            vec!["/section[1]/p[2]/b[2]".to_string(), "/section[1]/div[2]/i[2]".to_string()]
        );
    }

    #[test]
    fn test_adjacent_regions_merged() {
        let narrow = "<p><b>n</b><b>n</b></p><div><i>p</i><i>p</i></div>";
        let wide = "<p><b>n</b><b>n</b><b>n</b><b>n</b><b>n</b></p>\
                    <div><i>p</i><i>p</i><i>p</i><i>p</i><i>p</i></div>";
        let markup = format!("<section>{0}{0}{1}{1}</section>", narrow, wide);
        let (tree, groups) = identify(&markup);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert!(group.is_merged());
        assert_eq!(group.regions[0].end(), group.regions[1].start);
        assert_eq!(group.parent(), tree.root_element_id());

        // One record per child position across all eight components
        assert_eq!(group.records.len(), 5);
        assert_eq!(group.records[0].nodes().len(), 8);
        assert_eq!(group.records[4].nodes().len(), 4);
        assert_eq!(
            group.records[0].paths(&tree)[..2],
            ["/section[1]/p[1]/b[1]".to_string(), "/section[1]/div[1]/i[1]".to_string()]
        );
        assert_eq!(
            group.records[4].paths(&tree),
            vec![
                "/section[1]/p[3]/b[5]".to_string(),
                "/section[1]/div[3]/i[5]".to_string(),
                "/section[1]/p[4]/b[5]".to_string(),
                "/section[1]/div[4]/i[5]".to_string(),
            ]
        );

        // Differs from identifying each region on its own
        let separate = {
            let mut sim = StructuralSimilarity::new(&tree, 1024);
            let mut records = region_records(&mut sim, &group.regions[0], 0.3);
            records.extend(region_records(&mut sim, &group.regions[1], 0.3));
            records
        };
        assert_eq!(separate.len(), 2 * 2 + 2 * 5);
        assert_ne!(group.records, separate);
    }

    #[test]
    fn test_unalignable_adjacent_regions_stay_separate() {
        let narrow = "<h3>a</h3><p>x</p>";
        let wide = "<h3>a</h3><div><span><b>1</b></span><span><b>2</b></span><span><b>3</b></span></div>";
        let markup = format!("<section>{0}{0}{1}{1}</section>", narrow, wide);
        let (_, groups) = identify(&markup);

        assert!(groups.iter().all(|g| !g.is_merged()));
        assert!(groups.len() >= 2);
    }

    #[test]
    fn test_group_paths_skip_text_members() {
        let tree = parse_markup(b"<div>intro<p>x</p></div>").unwrap();
        let div = tree.root_element_id().unwrap();
        let record = DataRecord::Group(tree.children(div).to_vec());
        assert_eq!(record.paths(&tree), vec!["/div[1]/p[1]".to_string()]);

        let text = tree.children(div)[0];
        assert_eq!(DataRecord::Node(text).paths(&tree), vec!["/div[1]".to_string()]);
    }
}
