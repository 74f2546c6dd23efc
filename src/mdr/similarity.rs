//! Structural Similarity
//!
//! Compares node sequences by tag structure only. Each sequence is
//! flattened into a bracket signature (an open token and a close token per
//! element, nothing for text) and scored with an LCS-based normalized edit
//! distance:
//!
//! ```text
//! d = (len1 + len2 - 2 * LCS) / ((len1 + len2) / 2)
//! ```
//!
//! clamped to `[0, 1]`. Signatures whose lengths differ by more than 2x
//! short-circuit to 1.0 without running the alignment.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::dom::{NodeId, TagPool, TagTree};

/// Flattened structure of a node sequence
pub type Signature = Vec<u32>;

#[inline]
fn open_token(tag_id: u32) -> u32 {
    tag_id << 1
}

#[inline]
fn close_token(tag_id: u32) -> u32 {
    (tag_id << 1) | 1
}

/// Append the signature of one node to `out`
///
/// Walks the subtree with an explicit stack; deep trees cannot overflow.
pub fn flatten_node_into(tree: &TagTree, id: NodeId, out: &mut Signature) {
    flatten_node_mapped(tree, id, out, &mut |tag_id| tag_id);
}

fn flatten_node_mapped<F: FnMut(u32) -> u32>(
    tree: &TagTree,
    id: NodeId,
    out: &mut Signature,
    map_tag: &mut F,
) {
    let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];

    while let Some((current, closing)) = stack.pop() {
        let node = tree.node(current);
        if node.is_text() {
            continue;
        }
        let tag_id = map_tag(node.tag_id);
        if closing {
            out.push(close_token(tag_id));
            continue;
        }
        out.push(open_token(tag_id));
        stack.push((current, true));
        stack.extend(node.children.iter().rev().map(|&c| (c, false)));
    }
}

/// Signature of a node sequence
pub fn flatten(tree: &TagTree, nodes: &[NodeId]) -> Signature {
    let mut out = Signature::new();
    for &id in nodes {
        flatten_node_into(tree, id, &mut out);
    }
    out
}

/// Normalized LCS edit distance between two signatures
pub fn normalized_distance(a: &[u32], b: &[u32]) -> f64 {
    let (len1, len2) = (a.len(), b.len());
    if len1 == 0 && len2 == 0 {
        return 0.0;
    }

    let (short, long) = if len1 <= len2 { (len1, len2) } else { (len2, len1) };
    if long > 2 * short {
        return 1.0;
    }

    let lcs = lcs_len(a, b);
    let total = (len1 + len2) as f64;
    let distance = (total - 2.0 * lcs as f64) / (total / 2.0);
    distance.clamp(0.0, 1.0)
}

/// Length of the longest common subsequence (two-row DP)
fn lcs_len(a: &[u32], b: &[u32]) -> usize {
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];

    for &x in outer {
        for (j, &y) in inner.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

/// Per-run memo of signature-pair distances
///
/// Keys are order-normalized, so `d(A, B)` and `d(B, A)` share one entry.
/// Never outlives the run that created it.
pub struct SimilarityCache {
    entries: LruCache<(Signature, Signature), f64>,
    hits: u64,
    misses: u64,
}

impl SimilarityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        SimilarityCache {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Distance between two signatures, memoized
    pub fn distance(&mut self, a: Signature, b: Signature) -> f64 {
        let key = if a <= b { (a, b) } else { (b, a) };
        if let Some(&d) = self.entries.get(&key) {
            self.hits += 1;
            return d;
        }
        self.misses += 1;
        let d = normalized_distance(&key.0, &key.1);
        self.entries.put(key, d);
        d
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (between independent documents)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Similarity engine bound to one tree for one run
///
/// Holds the pair cache plus each node's own signature, so a window of
/// `g` siblings is assembled from cached parts instead of re-walking the
/// subtrees.
pub struct StructuralSimilarity<'t> {
    tree: &'t TagTree,
    cache: SimilarityCache,
    node_signatures: Vec<Option<Signature>>,
}

impl<'t> StructuralSimilarity<'t> {
    pub fn new(tree: &'t TagTree, cache_capacity: usize) -> Self {
        StructuralSimilarity {
            tree,
            cache: SimilarityCache::new(cache_capacity),
            node_signatures: vec![None; tree.node_count()],
        }
    }

    pub fn tree(&self) -> &'t TagTree {
        self.tree
    }

    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    /// Signature of a node sequence, built from per-node parts
    pub fn signature(&mut self, nodes: &[NodeId]) -> Signature {
        let mut out = Signature::new();
        for &id in nodes {
            let slot = &mut self.node_signatures[id as usize];
            let part = slot.get_or_insert_with(|| {
                let mut sig = Signature::new();
                flatten_node_into(self.tree, id, &mut sig);
                sig
            });
            out.extend_from_slice(part);
        }
        out
    }

    /// Distance between two node sequences
    pub fn distance(&mut self, a: &[NodeId], b: &[NodeId]) -> f64 {
        let sig_a = self.signature(a);
        let sig_b = self.signature(b);
        self.cache.distance(sig_a, sig_b)
    }

    /// True when the two sequences are within `threshold`
    #[inline]
    pub fn similar(&mut self, a: &[NodeId], b: &[NodeId], threshold: f64) -> bool {
        self.distance(a, b) <= threshold
    }

    /// True when every adjacent pair of `nodes` is within `threshold`
    pub fn chain_similar(&mut self, nodes: &[NodeId], threshold: f64) -> bool {
        nodes
            .windows(2)
            .all(|pair| self.similar(&pair[..1], &pair[1..], threshold))
    }
}

/// Uncached distance between two sequences of the same tree
pub fn distance(tree: &TagTree, a: &[NodeId], b: &[NodeId]) -> f64 {
    normalized_distance(&flatten(tree, a), &flatten(tree, b))
}

/// Distance between the top-level contents of two independent trees
///
/// The trees intern tags separately, so both are flattened through one
/// shared pool before comparing.
pub fn tree_distance(a: &TagTree, b: &TagTree) -> f64 {
    let mut shared = TagPool::new();
    let sig_a = flatten_shared(a, &mut shared);
    let sig_b = flatten_shared(b, &mut shared);
    normalized_distance(&sig_a, &sig_b)
}

fn flatten_shared(tree: &TagTree, shared: &mut TagPool) -> Signature {
    let mut out = Signature::new();
    let mut map_tag = |tag_id: u32| shared.intern(tree.tags().get_str(tag_id).unwrap_or(""));
    for &id in tree.children(TagTree::DOCUMENT) {
        flatten_node_mapped(tree, id, &mut out, &mut map_tag);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_markup;

    fn children_of_root(tree: &TagTree) -> Vec<NodeId> {
        let root = tree.root_element_id().unwrap();
        tree.children(root).to_vec()
    }

    #[test]
    fn test_flatten_ignores_text() {
        let tree = parse_markup(b"<div><p>hello <b>world</b></p></div>").unwrap();
        let div = tree.root_element_id().unwrap();
        let sig = flatten(&tree, &[div]);
        // <div> <p> <b> </b> </p> </div>
        assert_eq!(sig.len(), 6);
        assert_eq!(sig[0], open_token(tree.tag_id(div)));
        assert_eq!(sig[5], close_token(tree.tag_id(div)));
    }

    #[test]
    fn test_identity() {
        let tree = parse_markup(b"<ul><li><a>x</a></li><li><a>y</a></li></ul>").unwrap();
        let items = children_of_root(&tree);
        assert_eq!(distance(&tree, &items[..1], &items[..1]), 0.0);
        assert_eq!(distance(&tree, &items[..1], &items[1..]), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let tree = parse_markup(
            b"<div><p><a>x</a><b>y</b></p><p><a>x</a><i>z</i><b>y</b></p></div>",
        )
        .unwrap();
        let items = children_of_root(&tree);
        let ab = distance(&tree, &items[..1], &items[1..]);
        let ba = distance(&tree, &items[1..], &items[..1]);
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_known_distance() {
        // "<p><a></a></p>" vs "<p><a></a><i></i></p>": lengths 4 and 6, LCS 4
        let tree = parse_markup(b"<div><p><a>x</a></p><p><a>x</a><i>z</i></p></div>").unwrap();
        let items = children_of_root(&tree);
        let d = distance(&tree, &items[..1], &items[1..]);
        assert!((d - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_length_guard() {
        let a = vec![2, 3];
        let b = vec![2, 4, 6, 7, 5, 3];
        assert_eq!(normalized_distance(&a, &b), 1.0);
    }

    #[test]
    fn test_empty_signatures() {
        assert_eq!(normalized_distance(&[], &[]), 0.0);
        assert_eq!(normalized_distance(&[], &[2, 3]), 1.0);
    }

    #[test]
    fn test_disjoint_clamped_to_one() {
        assert_eq!(normalized_distance(&[2, 3], &[4, 5]), 1.0);
    }

    #[test]
    fn test_lcs_len() {
        assert_eq!(lcs_len(&[1, 2, 3, 4], &[2, 4]), 2);
        assert_eq!(lcs_len(&[1, 2, 3], &[3, 2, 1]), 1);
        assert_eq!(lcs_len(&[], &[1]), 0);
    }

    #[test]
    fn test_cache_hits_both_orders() {
        let tree = parse_markup(b"<ul><li><a>x</a></li><li><b>y</b></li></ul>").unwrap();
        let items = children_of_root(&tree);
        let mut sim = StructuralSimilarity::new(&tree, 16);

        let d1 = sim.distance(&items[..1], &items[1..]);
        let d2 = sim.distance(&items[1..], &items[..1]);
        assert_eq!(d1, d2);
        assert_eq!(sim.cache().misses(), 1);
        assert_eq!(sim.cache().hits(), 1);
        assert_eq!(sim.cache().len(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = SimilarityCache::new(4);
        cache.distance(vec![2, 3], vec![2, 3]);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_chain_similar() {
        let tree = parse_markup(b"<ul><li><a>x</a></li><li><a>y</a></li><li><a>z</a></li></ul>").unwrap();
        let items = children_of_root(&tree);
        let mut sim = StructuralSimilarity::new(&tree, 16);
        assert!(sim.chain_similar(&items, 0.3));
        assert!(sim.chain_similar(&items[..1], 0.3));
    }

    #[test]
    fn test_tree_distance_across_pools() {
        let a = parse_markup(b"<table><tr><td>1</td></tr></table>").unwrap();
        let b = parse_markup(b"<div><span>x</span></div><table><tr><td>2</td></tr></table>").unwrap();
        let c = parse_markup(b"<table><tr><td>3</td></tr></table>").unwrap();
        assert_eq!(tree_distance(&a, &c), 0.0);
        assert!(tree_distance(&a, &b) > 0.0);
    }
}
