//! Orphan Recovery
//!
//! Children of a region-holding parent that no region covers can still be
//! records. Each is compared with the parent's representative, the first
//! component of its first region: every child of the uncovered node, then
//! the uncovered node as a whole. Every match is recovered.

use std::collections::HashSet;

use log::debug;

use super::record::DataRecord;
use super::region::DataRegion;
use super::similarity::StructuralSimilarity;
use crate::dom::NodeId;

/// Recover records from uncovered children
///
/// `regions` must be in document order. `known_paths` holds the paths of
/// every identified record; recovered records are checked against it and
/// added to it.
pub fn recover_orphans(
    sim: &mut StructuralSimilarity<'_>,
    regions: &[DataRegion],
    known_paths: &mut HashSet<String>,
    threshold: f64,
) -> Vec<DataRecord> {
    let tree = sim.tree();
    let mut recovered = Vec::new();
    let mut visited_parents: Vec<NodeId> = Vec::new();

    for first in regions {
        let parent = first.parent;
        if visited_parents.contains(&parent) {
            continue;
        }
        visited_parents.push(parent);

        let children = tree.children(parent);
        let representative = [children[first.start]];
        let parent_regions: Vec<&DataRegion> =
            regions.iter().filter(|r| r.parent == parent).collect();

        for (index, &child) in children.iter().enumerate() {
            if tree.is_text(child) || parent_regions.iter().any(|r| r.covers(index)) {
                continue;
            }

            for &grandchild in tree.children(child) {
                if !tree.is_text(grandchild) && sim.similar(&[grandchild], &representative, threshold) {
                    push_unique(
                        tree.path(grandchild),
                        DataRecord::Node(grandchild),
                        known_paths,
                        &mut recovered,
                    );
                }
            }

            if sim.similar(&[child], &representative, threshold) {
                push_unique(tree.path(child), DataRecord::Node(child), known_paths, &mut recovered);
            }
        }
    }

    if !recovered.is_empty() {
        debug!("recovered {} orphan record(s)", recovered.len());
    }
    recovered
}

fn push_unique(
    path: &str,
    record: DataRecord,
    known_paths: &mut HashSet<String>,
    recovered: &mut Vec<DataRecord>,
) {
    if known_paths.insert(path.to_string()) {
        recovered.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_markup, TagTree};
    use crate::mdr::record::{identify_records, RecordGroup};
    use crate::mdr::region::detect_regions;

    fn recover(markup: &str, threshold: f64) -> (TagTree, Vec<RecordGroup>, Vec<DataRecord>) {
        let tree = parse_markup(markup.as_bytes()).unwrap();
        let (groups, orphans) = {
            let mut sim = StructuralSimilarity::new(&tree, 1024);
            let map = detect_regions(&mut sim, 10, threshold);
            let regions = map.document_regions();
            let groups = identify_records(&mut sim, regions, threshold);
            let mut known: HashSet<String> = groups
                .iter()
                .flat_map(|g| g.records.iter().flat_map(|r| r.paths(&tree)))
                .collect();
            let orphans = recover_orphans(&mut sim, regions, &mut known, threshold);
            (groups, orphans)
        };
        (tree, groups, orphans)
    }

    #[test]
    fn test_separated_item_recovered() {
        // The third item sits after a dissimilar block, outside the region
        let markup = "<div><p><a>1</a><b>x</b></p><p><a>2</a><b>y</b></p>\
            <hr/><p><a>3</a><b>z</b></p></div>";
        let (tree, groups, orphans) = recover(markup, 0.3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].paths(&tree), vec!["/div[1]/p[3]".to_string()]);
    }

    #[test]
    fn test_nested_item_recovered() {
        let markup = "<div><p><a>1</a><b>x</b></p><p><a>2</a><b>y</b></p>\
            <section><p><a>3</a><b>z</b></p><form><input/></form></section></div>";
        let (tree, _, orphans) = recover(markup, 0.3);
        let paths: Vec<_> = orphans.iter().map(|r| r.paths(&tree)).collect();
        assert_eq!(paths, vec![vec!["/div[1]/section[1]/p[1]".to_string()]]);
    }

    #[test]
    fn test_dissimilar_child_not_recovered() {
        let markup = "<div><p><a>1</a><b>x</b></p><p><a>2</a><b>y</b></p>\
            <table><tr><td>1</td></tr><tr><td>2</td></tr></table></div>";
        let (_, groups, orphans) = recover(markup, 0.3);
        assert!(orphans.is_empty());
        assert!(!groups.is_empty());
    }

    #[test]
    fn test_known_paths_not_duplicated() {
        let tree = parse_markup(b"<div><p><a>1</a></p><p><a>2</a></p><p><a>3</a></p></div>").unwrap();
        let div = tree.root_element_id().unwrap();
        // A region covering only the first two, with the third already known
        let regions = [DataRegion { parent: div, gn_size: 1, start: 0, node_count: 2 }];
        let mut known: HashSet<String> = ["/div[1]/p[3]".to_string()].into_iter().collect();

        let mut sim = StructuralSimilarity::new(&tree, 64);
        let orphans = recover_orphans(&mut sim, &regions, &mut known, 0.3);
        assert!(orphans.is_empty());
    }

    #[test]
    fn test_representative_is_region_component() {
        // The <ul> region splits into <li> records, but orphans are matched
        // against the first <ul> itself
        let list = "<ul><li><a>1</a></li><li><a>2</a></li><li><a>3</a></li></ul>";
        let markup = format!(
            "<body>{0}{0}<div><form><input/></form></div>{0}</body>",
            list
        );
        let (tree, groups, orphans) = recover(&markup, 0.3);
        assert_eq!(
            groups[0].records[0].paths(&tree),
            vec!["/body[1]/ul[1]/li[1]".to_string()]
        );
        let paths: Vec<_> = orphans.iter().map(|r| r.paths(&tree)).collect();
        assert_eq!(paths, vec![vec!["/body[1]/ul[3]".to_string()]]);
    }

    #[test]
    fn test_children_and_whole_node_both_recovered() {
        let item = "<div><span>a</span><span>b</span><span>c</span><span>d</span></div>";
        let nested = "<div><div><span>a</span><span>b</span><span>c</span></div></div>";
        let markup = format!("<body>{0}{0}<form><input/></form>{1}</body>", item, nested);
        let (tree, _, orphans) = recover(&markup, 0.45);
        let paths: Vec<_> = orphans.iter().map(|r| r.paths(&tree)).collect();
        assert_eq!(
            paths,
            vec![
                vec!["/body[1]/div[3]/div[1]".to_string()],
                vec!["/body[1]/div[3]".to_string()],
            ]
        );
    }
}
