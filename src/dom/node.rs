//! Tag node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Tag name used for text leaves
pub const TEXT_TAG: &str = "text";

/// Tag name of the synthetic document node
pub const DOCUMENT_TAG: &str = "#document";

/// Type of tag node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Trimmed, non-empty text content
    Text,
}

/// A node in the tag tree arena
#[derive(Debug, Clone)]
pub struct TagNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for document root)
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Index into the tag pool
    pub tag_id: u32,
    /// Text content, empty unless this is a text node
    pub raw_text: String,
    /// Structural identifier; text nodes store their parent's path
    pub path: String,
    /// Depth in tree (document = 0)
    pub depth: u16,
}

impl TagNode {
    /// Create a new document root node
    pub fn document(tag_id: u32) -> Self {
        TagNode {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
            tag_id,
            raw_text: String::new(),
            path: "/".to_string(),
            depth: 0,
        }
    }

    /// Create a new element node
    pub fn element(tag_id: u32, parent: NodeId, path: String, depth: u16) -> Self {
        TagNode {
            kind: NodeKind::Element,
            parent: Some(parent),
            children: Vec::new(),
            tag_id,
            raw_text: String::new(),
            path,
            depth,
        }
    }

    /// Create a new text node
    pub fn text(tag_id: u32, parent: NodeId, raw_text: String, path: String, depth: u16) -> Self {
        TagNode {
            kind: NodeKind::Text,
            parent: Some(parent),
            children: Vec::new(),
            tag_id,
            raw_text,
            path,
            depth,
        }
    }

    /// Check if this is a text node
    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}
