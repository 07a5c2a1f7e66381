//! Anchor serializer: live selection in, portable [`Anchor`] out.
//!
//! Only the selected text is mandatory. Context and structural boundaries
//! are best-effort; when they cannot be computed the anchor simply carries
//! less disambiguation power.

use crate::anchoring::address::{StructuralAddress, StructuralBoundary};
use crate::anchoring::anchor::Anchor;
use crate::anchoring::flatten::{FlatText, flatten};
use crate::anchoring::normalize::{byte_to_char_offset, collapse_whitespace};
use crate::anchoring::range::{DomPoint, TextPosition, TextRange};
use crate::dom::{Document, NodeKind};

/// Default number of context characters kept on each side.
pub const DEFAULT_CONTEXT_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorOptions {
    /// Maximum prefix/suffix length, in chars, before whitespace collapsing
    pub max_chars: usize,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CONTEXT_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("selection is empty")]
    EmptySelection,
    /// A boundary is not a node of this document, the boundaries sit in
    /// different trees, or they are reversed
    #[error("selection boundaries do not form a range")]
    InvalidBoundary,
}

/// Build an anchor for `range`.
///
/// A selection in a detached subtree still gets an anchor, carrying only
/// the selected text.
pub fn serialize_range(
    doc: &Document,
    range: &TextRange,
    options: &AnchorOptions,
) -> Result<Anchor, SerializeError> {
    let selected_text = range.text(doc).ok_or(SerializeError::InvalidBoundary)?;
    if selected_text.trim().is_empty() {
        return Err(SerializeError::EmptySelection);
    }
    if !doc.is_attached(range.start.container) || !doc.is_attached(range.end.container) {
        log::debug!("Selection is detached, anchoring on text alone");
        return Ok(Anchor::from_text(selected_text));
    }

    let flat = flatten(doc, doc.body());
    let (prefix, suffix) = match (flat.locate(doc, range.start), flat.locate(doc, range.end)) {
        (Some(start), Some(end)) => (
            collapse_whitespace(&chars_before(&flat, start, options.max_chars)),
            collapse_whitespace(&chars_after(&flat, end, options.max_chars)),
        ),
        _ => {
            log::debug!("Selection lies outside the body, anchoring without context");
            (String::new(), String::new())
        }
    };

    Ok(Anchor {
        selected_text,
        prefix,
        suffix,
        structural_start: structural_boundary(doc, &flat, range.start),
        structural_end: structural_boundary(doc, &flat, range.end),
    })
}

/// Up to `max_chars` raw chars immediately before `position`.
fn chars_before(flat: &FlatText, position: TextPosition, max_chars: usize) -> String {
    let mut pieces = Vec::new();
    let mut need = max_chars;

    for unit in (0..=position.unit).rev() {
        if need == 0 {
            break;
        }
        let Some(unit_text) = flat.get(unit).map(|u| u.text.as_str()) else {
            continue;
        };
        let available = if unit == position.unit {
            unit_text.get(..position.offset).unwrap_or_default()
        } else {
            unit_text
        };
        let taken: Vec<char> = available.chars().rev().take(need).collect();
        need -= taken.len();
        pieces.push(taken.into_iter().rev().collect::<String>());
    }

    pieces.into_iter().rev().collect()
}

/// Up to `max_chars` raw chars immediately after `position`.
fn chars_after(flat: &FlatText, position: TextPosition, max_chars: usize) -> String {
    let mut out = String::new();
    let mut need = max_chars;

    for unit in position.unit..flat.len() {
        if need == 0 {
            break;
        }
        let Some(unit_text) = flat.get(unit).map(|u| u.text.as_str()) else {
            continue;
        };
        let available = if unit == position.unit {
            unit_text.get(position.offset..).unwrap_or_default()
        } else {
            unit_text
        };
        let taken: String = available.chars().take(need).collect();
        need -= taken.chars().count();
        out.push_str(&taken);
    }

    out
}

/// Address of the element holding `point`, plus a char offset into the
/// text node that boundary lands in.
fn structural_boundary(
    doc: &Document,
    flat: &FlatText,
    point: DomPoint,
) -> Option<StructuralBoundary> {
    let element = doc.nearest_element(point.container)?;
    let address = StructuralAddress::for_element(doc, element)?;

    let offset = match doc.kind(point.container)? {
        NodeKind::Text(content) => byte_to_char_offset(content, point.offset),
        // Element boundaries count into the element's first text leaf when
        // the boundary falls there, otherwise they start at its beginning
        NodeKind::Element(_) => {
            let first_text = doc.descendants(element).find(|&id| doc.is_text(id));
            match (flat.locate(doc, point), first_text) {
                (Some(position), Some(first)) if flat.unit_of(first) == Some(position.unit) => {
                    byte_to_char_offset(doc.text(first)?, position.offset)
                }
                _ => 0,
            }
        }
    };

    Some(StructuralBoundary { address, offset })
}
