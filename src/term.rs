//! Elixir Term Conversion Utilities
//!
//! Decodes tag trees from Elixir maps and encodes mining results.
//!
//! Tree shape, one map per node:
//! `%{tag: "li", path: "/ul[1]/li[1]", text: nil, children: [...]}`.
//! Text nodes use the tag `"text"` and must carry a binary `:text`; their
//! `:path` is ignored because a text node always reports its parent's path.
//! Elements must carry `:tag` and `:path`; `:children` may be omitted.

use rustler::{Encoder, Env, Term};

use crate::dom::{TagTree, TagTreeBuilder, TEXT_TAG};
use crate::error::{MineError, Result};
use crate::mdr::RegionMap;

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    tag,
    path,
    text,
    children,
}

/// One region as `{parent_path, g, start, count}`
pub type RegionRow = (String, usize, usize, usize);

/// Walk frame for the explicit decode stack
enum Frame<'a> {
    Enter(Term<'a>),
    Exit,
}

/// Decode a tree term into a validated `TagTree`
///
/// Walks the term with an explicit stack, so deeply nested input cannot
/// overflow the scheduler thread's stack.
pub fn decode_tree(term: Term<'_>) -> Result<TagTree> {
    let mut builder = TagTreeBuilder::new();
    let mut stack = vec![Frame::Enter(term)];

    while let Some(frame) = stack.pop() {
        let node = match frame {
            Frame::Enter(node) => node,
            Frame::Exit => {
                builder.close()?;
                continue;
            }
        };

        if !node.is_map() {
            return Err(MineError::invalid_input("tree node must be a map"));
        }

        let tag_name = required(field(node, tag(), "tag")?, || "node is missing :tag".to_string())?;
        let kids = child_terms(node, &tag_name)?;

        if tag_name == TEXT_TAG {
            if !kids.is_empty() {
                return Err(MineError::invalid_input("text node has children"));
            }
            let raw = required(field(node, text(), "text")?, || {
                "text node is missing :text".to_string()
            })?;
            // Whitespace-only text does not become a node
            builder.text(&raw);
            continue;
        }

        let node_path = required(field(node, path(), "path")?, || {
            format!("<{}> node is missing :path", tag_name)
        })?;
        builder.open_with_path(&tag_name, node_path)?;

        stack.push(Frame::Exit);
        stack.extend(kids.into_iter().rev().map(Frame::Enter));
    }

    builder.finish()
}

/// Optional string field: absent and `nil` both decode to `None`
fn field(node: Term<'_>, key: rustler::Atom, name: &str) -> Result<Option<String>> {
    let Ok(value) = node.map_get(key) else {
        return Ok(None);
    };
    value
        .decode::<Option<String>>()
        .map_err(|_| MineError::invalid_input(format!(":{} must be a binary or nil", name)))
}

/// A field every node of its kind must carry
fn required(value: Option<String>, missing: impl FnOnce() -> String) -> Result<String> {
    value.ok_or_else(|| MineError::InvalidInput(missing()))
}

fn child_terms<'a>(node: Term<'a>, tag_name: &str) -> Result<Vec<Term<'a>>> {
    let Ok(value) = node.map_get(children()) else {
        return Ok(Vec::new());
    };
    value.decode::<Vec<Term<'a>>>().map_err(|_| {
        MineError::invalid_input(format!(":children of <{}> must be a list", tag_name))
    })
}

/// Decode `T`, accepting an integer where a float is expected
pub fn decode_threshold(term: Term<'_>) -> Result<f64> {
    if let Ok(value) = term.decode::<f64>() {
        return Ok(value);
    }
    term.decode::<i64>()
        .map(|value| value as f64)
        .map_err(|_| MineError::invalid_parameter("threshold must be a number"))
}

/// Region map as rows, in document order
pub fn region_rows(tree: &TagTree, map: &RegionMap) -> Vec<RegionRow> {
    map.document_regions()
        .iter()
        .map(|r| (tree.path(r.parent).to_string(), r.gn_size, r.start, r.node_count))
        .collect()
}

/// `{:ok, value}` or `{:error, message}`
pub fn result_to_term<'a, T: Encoder>(env: Env<'a>, result: Result<T>) -> Term<'a> {
    match result {
        Ok(value) => (ok(), value).encode(env),
        Err(e) => (error(), e.to_string()).encode(env),
    }
}
