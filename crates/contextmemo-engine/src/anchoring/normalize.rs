//! Whitespace normalization shared by the serializer and the resolver.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Collapse every whitespace run to a single space. Does not trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

/// Collapse whitespace runs and trim both ends.
pub fn normalize_spaces(text: &str) -> String {
    collapse_whitespace(text).trim().to_string()
}

/// One character of a per-unit collapsed string, with the byte offset of
/// the raw character it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapsedChar {
    pub ch: char,
    pub raw_offset: usize,
    /// Byte length of the raw run this character stands for
    pub raw_len: usize,
}

/// Collapse whitespace within one string, keeping track of where each
/// output character came from. A whitespace run maps to its first byte.
pub fn collapse_with_offsets(text: &str) -> Vec<CollapsedChar> {
    let mut out: Vec<CollapsedChar> = Vec::with_capacity(text.len());
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(last) = out.last_mut()
                && last.ch == ' '
            {
                last.raw_len += ch.len_utf8();
                continue;
            }
            out.push(CollapsedChar {
                ch: ' ',
                raw_offset: offset,
                raw_len: ch.len_utf8(),
            });
        } else {
            out.push(CollapsedChar {
                ch,
                raw_offset: offset,
                raw_len: ch.len_utf8(),
            });
        }
    }
    out
}

/// Byte offset of the `n`th char of `text`, clamped to its length.
pub fn char_to_byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

/// Number of chars in `text[..byte_offset]`.
pub fn byte_to_char_offset(text: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(text.len());
    text.char_indices().take_while(|(offset, _)| *offset < end).count()
}
