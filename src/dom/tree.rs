//! Tag Tree - Arena-based tag tree representation
//!
//! Efficient tree storage with:
//! - Arena allocation for nodes, document node at id 0
//! - NodeId indices for traversal
//! - Tag interning for names
//! - Paths assigned once, at construction
//!
//! Nodes are always appended in document (pre-)order, so a child's id is
//! greater than its parent's. The miner relies on this to walk the tree
//! bottom-up without recursion.

use std::collections::{HashMap, HashSet};

use super::node::{NodeId, NodeKind, TagNode};
use super::strings::{TagPool, DOCUMENT_TAG_ID, TEXT_TAG_ID};
use crate::error::{MineError, Result};

/// A tag tree stored in arena format
#[derive(Debug, Clone)]
pub struct TagTree {
    /// Arena of nodes
    nodes: Vec<TagNode>,
    /// Interned tag names
    tags: TagPool,
}

impl TagTree {
    /// Id of the document node
    pub const DOCUMENT: NodeId = 0;

    /// Start building a tree
    pub fn builder() -> TagTreeBuilder {
        TagTreeBuilder::new()
    }

    /// Get the first element under the document node
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.children(Self::DOCUMENT)
            .iter()
            .copied()
            .find(|&id| self.nodes[id as usize].kind == NodeKind::Element)
    }

    /// Get a node by ID
    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&TagNode> {
        self.nodes.get(id as usize)
    }

    /// Get a node by ID, for ids handed out by this tree
    #[inline]
    pub fn node(&self, id: NodeId) -> &TagNode {
        &self.nodes[id as usize]
    }

    /// Children of a node in document order
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Interned tag id of a node
    #[inline]
    pub fn tag_id(&self, id: NodeId) -> u32 {
        self.node(id).tag_id
    }

    /// Tag name of a node
    pub fn tag_name(&self, id: NodeId) -> &str {
        self.tags.get_str(self.tag_id(id)).unwrap_or("")
    }

    /// Path identifier of a node (text nodes report their parent's)
    #[inline]
    pub fn path(&self, id: NodeId) -> &str {
        &self.node(id).path
    }

    /// Text content of a text node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        if node.is_text() {
            Some(&node.raw_text)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).is_text()
    }

    /// True when at least one child has children of its own
    pub fn has_grandchildren(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|&c| self.node(c).has_children())
    }

    /// Get total number of nodes, document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The tag pool for direct access
    pub fn tags(&self) -> &TagPool {
        &self.tags
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        DescendantIter { tree: self, stack }
    }

    /// Check the arena invariants
    ///
    /// Runs before any mining so a malformed tree is rejected up front
    /// instead of being partially processed.
    pub fn validate(&self) -> Result<()> {
        let Some(document) = self.nodes.first() else {
            return Err(MineError::invalid_input("tree has no nodes"));
        };
        if document.kind != NodeKind::Document || document.parent.is_some() {
            return Err(MineError::invalid_input("node 0 must be the document node"));
        }

        let mut seen_paths: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut linked = vec![false; self.nodes.len()];
        linked[0] = true;

        for (idx, node) in self.nodes.iter().enumerate() {
            let id = idx as NodeId;

            match node.kind {
                NodeKind::Document if idx != 0 => {
                    return Err(MineError::invalid_input(format!(
                        "node {} is a second document node",
                        id
                    )));
                }
                NodeKind::Text => {
                    if node.has_children() {
                        return Err(MineError::invalid_input(format!(
                            "text node at {} has children",
                            node.path
                        )));
                    }
                    if node.raw_text.is_empty() {
                        return Err(MineError::invalid_input(format!(
                            "text node at {} is empty",
                            node.path
                        )));
                    }
                }
                NodeKind::Element => {
                    if self.tags.get_str(node.tag_id).is_none_or(str::is_empty) {
                        return Err(MineError::invalid_input(format!(
                            "element {} has no tag name",
                            id
                        )));
                    }
                    if node.path.is_empty() {
                        return Err(MineError::invalid_input(format!(
                            "element {} <{}> has no path",
                            id,
                            self.tag_name(id)
                        )));
                    }
                    if !seen_paths.insert(node.path.as_str()) {
                        return Err(MineError::invalid_input(format!(
                            "duplicate path {}",
                            node.path
                        )));
                    }
                }
                NodeKind::Document => {}
            }

            for &child in &node.children {
                let child_node = self.get_node(child).ok_or_else(|| {
                    MineError::invalid_input(format!("node {} has dangling child {}", id, child))
                })?;
                if child <= id || child_node.parent != Some(id) {
                    return Err(MineError::invalid_input(format!(
                        "node {} is not linked back to parent {}",
                        child, id
                    )));
                }
                if std::mem::replace(&mut linked[child as usize], true) {
                    return Err(MineError::invalid_input(format!(
                        "node {} has more than one parent",
                        child
                    )));
                }
            }
        }

        if let Some(orphan) = linked.iter().position(|&l| !l) {
            return Err(MineError::invalid_input(format!(
                "node {} is not reachable from the document",
                orphan
            )));
        }

        Ok(())
    }
}

/// Iterator over descendant nodes
pub struct DescendantIter<'a> {
    tree: &'a TagTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}

/// An element that has been opened but not closed yet
#[derive(Debug)]
struct OpenElement {
    id: NodeId,
    /// Same-tag sibling counters for the element's children
    sibling_counts: HashMap<u32, u32>,
}

impl OpenElement {
    fn new(id: NodeId) -> Self {
        OpenElement {
            id,
            sibling_counts: HashMap::new(),
        }
    }
}

/// Builds a `TagTree` in document order
///
/// `open` derives the path from the tag name and the 1-based same-tag
/// sibling index; `open_with_path` keeps a path computed elsewhere.
#[derive(Debug)]
pub struct TagTreeBuilder {
    nodes: Vec<TagNode>,
    tags: TagPool,
    stack: Vec<OpenElement>,
}

impl Default for TagTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTreeBuilder {
    pub fn new() -> Self {
        let tags = TagPool::new();
        let mut nodes = Vec::with_capacity(256);
        nodes.push(TagNode::document(DOCUMENT_TAG_ID));
        TagTreeBuilder {
            nodes,
            tags,
            stack: vec![OpenElement::new(TagTree::DOCUMENT)],
        }
    }

    /// Number of open elements (document excluded)
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Open an element, deriving its path
    pub fn open(&mut self, tag: &str) -> Result<NodeId> {
        let tag_id = self.intern_element_tag(tag)?;
        let top = self.top_mut();
        let count = top.sibling_counts.entry(tag_id).or_insert(0);
        *count += 1;
        let index = *count;
        let parent_id = top.id;

        let parent_path = &self.nodes[parent_id as usize].path;
        let name = self.tags.get_str(tag_id).unwrap_or("");
        let path = if parent_id == TagTree::DOCUMENT {
            format!("/{}[{}]", name, index)
        } else {
            format!("{}/{}[{}]", parent_path, name, index)
        };

        Ok(self.push_element(tag_id, path))
    }

    /// Open an element whose path was assigned by an external builder
    pub fn open_with_path(&mut self, tag: &str, path: impl Into<String>) -> Result<NodeId> {
        let tag_id = self.intern_element_tag(tag)?;
        let top = self.top_mut();
        *top.sibling_counts.entry(tag_id).or_insert(0) += 1;
        Ok(self.push_element(tag_id, path.into()))
    }

    /// Append a text leaf to the open element
    ///
    /// Text is trimmed; whitespace-only text is dropped and yields `None`.
    pub fn text(&mut self, raw: &str) -> Option<NodeId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let parent_id = self.top_mut().id;
        let parent = &self.nodes[parent_id as usize];
        let node = TagNode::text(
            TEXT_TAG_ID,
            parent_id,
            trimmed.to_string(),
            parent.path.clone(),
            parent.depth.saturating_add(1),
        );
        Some(self.push(parent_id, node))
    }

    /// Close the innermost open element
    pub fn close(&mut self) -> Result<NodeId> {
        if self.stack.len() <= 1 {
            return Err(MineError::invalid_input("close without open element"));
        }
        let open = self.stack.pop().map(|e| e.id).unwrap_or(TagTree::DOCUMENT);
        Ok(open)
    }

    /// Close the innermost open element named `tag` and everything inside it
    ///
    /// Returns false, closing nothing, when no such element is open.
    pub fn close_tag(&mut self, tag: &str) -> bool {
        let Some(tag_id) = self.tags.lookup(tag) else {
            return false;
        };
        let position = self
            .stack
            .iter()
            .skip(1)
            .rposition(|open| self.nodes[open.id as usize].tag_id == tag_id);
        match position {
            Some(pos) => {
                self.stack.truncate(pos + 1);
                true
            }
            None => false,
        }
    }

    /// Close everything still open and validate the result
    pub fn finish(mut self) -> Result<TagTree> {
        self.stack.truncate(1);
        let tree = TagTree {
            nodes: self.nodes,
            tags: self.tags,
        };
        tree.validate()?;
        Ok(tree)
    }

    fn intern_element_tag(&mut self, tag: &str) -> Result<u32> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(MineError::invalid_input("element with empty tag name"));
        }
        Ok(self.tags.intern(tag))
    }

    fn top_mut(&mut self) -> &mut OpenElement {
        // The document entry is never popped
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_element(&mut self, tag_id: u32, path: String) -> NodeId {
        let parent_id = self.top_mut().id;
        let depth = self.nodes[parent_id as usize].depth.saturating_add(1);
        let node = TagNode::element(tag_id, parent_id, path, depth);
        let id = self.push(parent_id, node);
        self.stack.push(OpenElement::new(id));
        id
    }

    fn push(&mut self, parent_id: NodeId, node: TagNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.nodes[parent_id as usize].children.push(id);
        id
    }
}
