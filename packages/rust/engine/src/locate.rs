//! Template block location.
//!
//! Blocks are found with an explicit depth count over `{{`/`}}` pairs, so a
//! nested template inside a block's body cannot cut the block short the way
//! a non-greedy pattern would. Tag recognition stays regex-based, anchored
//! at the start of the candidate body.

use std::sync::LazyLock;

use regex::Regex;

/// Tag of the canonical record block.
static RECORD_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^article ?history\s*(?:\||$)").expect("record tag regex"));

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// Byte span of one `{{...}}` block, marker pair included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// The whole block text, `{{` and `}}` included.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The block body between the markers.
    pub fn body<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start + 2..self.end - 2]
    }
}

// ---------------------------------------------------------------------------
// Depth-counting scanner
// ---------------------------------------------------------------------------

/// Find the `}}` matching the `{{` at byte offset `open`, marker included.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i + 2 <= bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i + 2);
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    None
}

/// Find every block whose body starts with a tag matching `tag`.
///
/// An opening marker with no matching close is skipped. When an outer block's
/// tag does not match, the scan continues inside it, so a matching block
/// nested in some unrelated template is still found.
pub fn find_blocks(text: &str, tag: &Regex) -> Vec<Span> {
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(offset) = text[from..].find("{{") {
        let open = from + offset;
        match matching_close(text, open) {
            Some(close) if tag.is_match(&text[open + 2..close - 2]) => {
                found.push(Span {
                    start: open,
                    end: close,
                });
                from = close;
            }
            _ => from = open + 2,
        }
    }

    found
}

/// Find the first record block, if the document has one.
pub fn locate_record(text: &str) -> Option<Span> {
    find_blocks(text, &RECORD_TAG_RE).into_iter().next()
}
