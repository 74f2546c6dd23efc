//! DOM Module - Arena-based tag tree
//!
//! Implements the miner's input representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - Tag interning for element names
//! - A lenient markup reader for clean XHTML/HTML fragments

pub mod markup;
pub mod node;
pub mod strings;
pub mod tree;

pub use markup::parse_markup;
pub use node::{NodeId, NodeKind, TagNode, DOCUMENT_TAG, TEXT_TAG};
pub use strings::TagPool;
pub use tree::{TagTree, TagTreeBuilder};
