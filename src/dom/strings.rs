//! Tag Name Interning Pool
//!
//! Every distinct tag name is stored once and referred to by a `u32` id.
//! Structural signatures are built from these ids, so two nodes with the
//! same tag always produce the same token regardless of where the name
//! came from (markup bytes or a decoded term).

use std::collections::HashMap;

use super::node::{DOCUMENT_TAG, TEXT_TAG};

/// Id of the `"text"` sentinel, reserved at pool creation
pub const TEXT_TAG_ID: u32 = 0;

/// Id of the document sentinel, reserved at pool creation
pub const DOCUMENT_TAG_ID: u32 = 1;

/// Tag interning pool
///
/// Memory layout:
/// - `entries`: tag name for each interned id
/// - `index`: tag name -> id
#[derive(Debug, Clone)]
pub struct TagPool {
    /// Names indexed by tag id
    entries: Vec<String>,
    /// Name -> id lookup
    index: HashMap<String, u32>,
}

impl Default for TagPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TagPool {
    /// Create a pool with the text and document sentinels reserved
    pub fn new() -> Self {
        let mut pool = TagPool {
            entries: Vec::with_capacity(64),
            index: HashMap::with_capacity(64),
        };
        pool.intern(TEXT_TAG);
        pool.intern(DOCUMENT_TAG);
        pool
    }

    /// Intern a tag name, lowercasing it first
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let lowered = name.to_ascii_lowercase();
        if let Some(&id) = self.index.get(&lowered) {
            return id;
        }

        let id = self.entries.len() as u32;
        self.entries.push(lowered.clone());
        self.index.insert(lowered, id);
        id
    }

    /// Look up an already interned name without inserting
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.index
            .get(name)
            .or_else(|| self.index.get(&name.to_ascii_lowercase()))
            .copied()
    }

    /// Get a tag name by id
    #[inline]
    pub fn get_str(&self, id: u32) -> Option<&str> {
        self.entries.get(id as usize).map(String::as_str)
    }

    /// Number of distinct tags, sentinels included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the sentinels are present
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_reserved() {
        let pool = TagPool::new();
        assert_eq!(pool.get_str(TEXT_TAG_ID), Some("text"));
        assert_eq!(pool.get_str(DOCUMENT_TAG_ID), Some("#document"));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = TagPool::new();
        let id1 = pool.intern("li");
        let id2 = pool.intern("li");
        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_intern_lowercases() {
        let mut pool = TagPool::new();
        let id1 = pool.intern("TR");
        let id2 = pool.intern("tr");
        assert_eq!(id1, id2);
        assert_eq!(pool.get_str(id1), Some("tr"));
        assert_eq!(pool.lookup("Tr"), Some(id1));
    }

    #[test]
    fn test_intern_different() {
        let mut pool = TagPool::new();
        assert_ne!(pool.intern("ul"), pool.intern("ol"));
        assert_eq!(pool.lookup("table"), None);
    }
}
