//! Lenient markup reader
//!
//! Turns a clean XHTML/HTML fragment into a `TagTree`. This is a tree
//! builder for already well-formed input, not an HTML normalizer:
//! - comments, doctypes and processing instructions are skipped
//! - void elements (`br`, `img`, ...) and `<x/>` close immediately
//! - `script`/`style` bodies are skipped
//! - an end tag closes the innermost matching open element; stray end
//!   tags are ignored and anything left open is closed at EOF
//! - entities are not decoded (text never affects structure)

use memchr::{memchr, memmem};

use super::tree::TagTree;
use crate::error::{MineError, Result};

/// Elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose body is raw text
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse a markup fragment into a tag tree
pub fn parse_markup(input: &[u8]) -> Result<TagTree> {
    let mut scanner = Scanner::new(input);
    let mut builder = TagTree::builder();
    let mut elements = 0usize;

    while !scanner.is_eof() {
        let Some(lt) = scanner.find_tag_start() else {
            push_text(&mut builder, scanner.remaining());
            break;
        };
        push_text(&mut builder, scanner.slice(scanner.position(), lt));
        scanner.set_position(lt);

        if scanner.starts_with(b"<!--") {
            scanner.skip_past(b"-->");
        } else if scanner.starts_with(b"<!") || scanner.starts_with(b"<?") {
            scanner.skip_past(b">");
        } else if scanner.starts_with(b"</") {
            scanner.advance(2);
            let name = scanner.read_name().map(String::from_utf8_lossy);
            scanner.skip_past(b">");
            if let Some(name) = name {
                builder.close_tag(&name.to_ascii_lowercase());
            }
        } else {
            scanner.advance(1);
            let Some(name) = scanner.read_name() else {
                // A lone '<' in text
                continue;
            };
            let name = String::from_utf8_lossy(name).to_ascii_lowercase();

            let self_closing = match scanner.find_tag_end_quoted() {
                Some(gt) => {
                    let closed = gt > 0 && input[gt - 1] == b'/';
                    scanner.set_position(gt + 1);
                    closed
                }
                None => {
                    scanner.set_position(input.len());
                    false
                }
            };

            builder.open(&name)?;
            elements += 1;

            if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                builder.close()?;
            } else if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                scanner.skip_raw_text(name.as_bytes());
                builder.close()?;
            }
        }
    }

    if elements == 0 {
        return Err(MineError::Markup("no elements found".to_string()));
    }

    builder.finish()
}

fn push_text(builder: &mut super::TagTreeBuilder, bytes: &[u8]) {
    if builder.depth() == 0 || bytes.is_empty() {
        return;
    }
    builder.text(&String::from_utf8_lossy(bytes));
}

/// Scanner for markup delimiter detection
struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.set_position(self.pos + n);
    }

    #[inline]
    fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Find next '<' (tag start) using SIMD
    #[inline]
    fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find the '>' ending the current tag, ignoring '>' inside quotes
    fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut in_single_quote = false;
        let mut in_double_quote = false;

        for (offset, &b) in self.input[self.pos..].iter().enumerate() {
            match b {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(self.pos + offset),
                _ => {}
            }
        }
        None
    }

    /// Move past the next occurrence of `needle`, or to EOF
    fn skip_past(&mut self, needle: &[u8]) {
        match memmem::find(&self.input[self.pos..], needle) {
            Some(i) => self.set_position(self.pos + i + needle.len()),
            None => self.set_position(self.input.len()),
        }
    }

    /// Skip a raw text body up to (and including) its `</name ...>`
    fn skip_raw_text(&mut self, name: &[u8]) {
        while let Some(i) = memmem::find(&self.input[self.pos..], b"</") {
            let start = self.pos + i + 2;
            let end = start + name.len();
            if end <= self.input.len() && self.input[start..end].eq_ignore_ascii_case(name) {
                self.set_position(end);
                self.skip_past(b">");
                return;
            }
            self.set_position(start);
        }
        self.set_position(self.input.len());
    }

    /// Read a tag name (letters, digits, '-', '_', '.', ':')
    fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let first = *self.input.get(start)?;
        if !is_name_start_char(first) {
            return None;
        }

        self.pos += 1;
        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }

        Some(&self.input[start..self.pos])
    }
}

#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}
