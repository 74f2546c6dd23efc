//! ResourceArc Wrappers
//!
//! A decoded tag tree kept in Rust memory, so one document can be mined
//! with several parameter sets without decoding the term again.

use rustler::ResourceArc;

use crate::dom::TagTree;

/// Wrapper for a validated TagTree that can be stored in a ResourceArc
///
/// The tree is never mutated after loading, so no lock is needed; every
/// mining call builds its own similarity cache.
pub struct TagTreeResource {
    pub tree: TagTree,
}

impl TagTreeResource {
    pub fn new(tree: TagTree) -> Self {
        TagTreeResource { tree }
    }

    /// Number of nodes, document node included
    pub fn node_count(&self) -> usize {
        self.tree.node_count()
    }
}

#[rustler::resource_impl]
impl rustler::Resource for TagTreeResource {}

/// Type alias for the ResourceArc
pub type TagTreeRef = ResourceArc<TagTreeResource>;
