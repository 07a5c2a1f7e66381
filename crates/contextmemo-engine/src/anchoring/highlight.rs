//! Highlight applicator: wrap a resolved range in a marker element.
//!
//! A range that covers several nodes is wrapped with extract-and-reinsert
//! semantics. Boundary text nodes are split, partially covered ancestors
//! are split into two shallow copies, and the covered run of siblings under
//! the common ancestor is moved into a single marker. The text stream is
//! unchanged by wrapping, so other anchors still resolve against it.
//!
//! Removing a highlight unwraps its marker and merges the text nodes that
//! wrapping split. Ancestor splits are not undone.

use crate::anchoring::flatten::FlatText;
use crate::anchoring::range::{InvalidRange, ResolvedRange, TextPosition};
use crate::dom::{Document, NodeId};

pub const MARKER_TAG: &str = "span";
/// Carries the note id on every marker
pub const NOTE_ID_ATTRIBUTE: &str = "data-contextmemo-id";
/// Latest note content, kept on the marker for tooltips
pub const CONTENT_ATTRIBUTE: &str = "data-contextmemo-content";
pub const MARKER_STYLE: &str = "background: rgba(245,183,36,0.6); border-radius: 3px; padding: 0 2px";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
    #[error("range covers no text")]
    Collapsed,
    #[error("document changed since it was flattened")]
    StaleSnapshot,
    #[error("range boundaries share no ancestor")]
    Detached,
}

/// Wrap `range` (indexing into `flat`) in a marker for `note_id`.
///
/// `flat` must describe the current document; it is stale once this
/// returns.
pub fn apply_highlight(
    doc: &mut Document,
    flat: &FlatText,
    range: &ResolvedRange,
    note_id: &str,
) -> Result<NodeId, HighlightError> {
    range.validate(flat)?;
    let (start, end) = tighten(flat, range.start(), range.end()).ok_or(HighlightError::Collapsed)?;

    let start_unit = flat.get(start.unit).ok_or(HighlightError::StaleSnapshot)?;
    let end_unit = flat.get(end.unit).ok_or(HighlightError::StaleSnapshot)?;
    for unit in [start_unit, end_unit] {
        if doc.text(unit.node) != Some(unit.text.as_str()) || !doc.is_attached(unit.node) {
            return Err(HighlightError::StaleSnapshot);
        }
    }

    // Split the end first so the start offset stays valid when both
    // boundaries share a node
    let mut end_node = end_unit.node;
    if end.offset < end_unit.text.len() {
        doc.split_text(end_node, end.offset)
            .ok_or(HighlightError::StaleSnapshot)?;
    }
    let mut start_node = start_unit.node;
    if start.offset > 0 {
        let same_node = start_node == end_node;
        start_node = doc
            .split_text(start_node, start.offset)
            .ok_or(HighlightError::StaleSnapshot)?;
        if same_node {
            end_node = start_node;
        }
    }

    let common = common_ancestor(doc, start_node, end_node).ok_or(HighlightError::Detached)?;
    let first = lift_start(doc, start_node, common).ok_or(HighlightError::Detached)?;
    let last = lift_end(doc, end_node, common).ok_or(HighlightError::Detached)?;

    let children = doc.children(common);
    let from = children.iter().position(|&c| c == first).ok_or(HighlightError::Detached)?;
    let to = children.iter().position(|&c| c == last).ok_or(HighlightError::Detached)?;
    let run: Vec<NodeId> = children[from..=to].to_vec();

    let marker = doc.create_element(
        MARKER_TAG,
        vec![
            (NOTE_ID_ATTRIBUTE.to_string(), note_id.to_string()),
            ("style".to_string(), MARKER_STYLE.to_string()),
        ],
    );
    wrap_run(doc, common, from, &run, marker)?;
    Ok(marker)
}

/// Put `marker` at `index` under `parent` and move `run` into it.
fn wrap_run(
    doc: &mut Document,
    parent: NodeId,
    index: usize,
    run: &[NodeId],
    marker: NodeId,
) -> Result<(), HighlightError> {
    if !doc.insert_child(parent, index, marker) {
        return Err(HighlightError::Detached);
    }
    for &node in run {
        if !doc.append_child(marker, node) {
            return Err(HighlightError::Detached);
        }
    }
    Ok(())
}

/// Every marker for `note_id`, in document order.
pub fn find_highlights(doc: &Document, note_id: &str) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .filter(|&id| is_marker(doc, id) && doc.attribute(id, NOTE_ID_ATTRIBUTE) == Some(note_id))
        .collect()
}

pub fn is_highlighted(doc: &Document, note_id: &str) -> bool {
    !find_highlights(doc, note_id).is_empty()
}

/// Store `content` on every marker for `note_id`. Returns how many markers
/// were updated.
pub fn update_highlight_content(doc: &mut Document, note_id: &str, content: &str) -> usize {
    let markers = find_highlights(doc, note_id);
    for &marker in &markers {
        doc.set_attribute(marker, CONTENT_ATTRIBUTE, content);
    }
    markers.len()
}

/// Unwrap every marker for `note_id`, keeping its content in place.
/// Returns how many markers were removed.
pub fn remove_highlight(doc: &mut Document, note_id: &str) -> usize {
    let markers = find_highlights(doc, note_id);
    for &marker in &markers {
        let (Some(parent), Some(index)) = (doc.parent(marker), doc.index_in_parent(marker)) else {
            continue;
        };
        let children = doc.children(marker).to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            doc.insert_child(parent, index + offset, child);
        }
        doc.detach(marker);
        merge_adjacent_text(doc, parent);
    }
    markers.len()
}

fn is_marker(doc: &Document, id: NodeId) -> bool {
    doc.tag_name(id) == Some(MARKER_TAG) && doc.attribute(id, NOTE_ID_ATTRIBUTE).is_some()
}

/// Move boundaries that sit on a unit edge inward, so wrapping never
/// creates empty text nodes. `None` when nothing is left to cover.
fn tighten(
    flat: &FlatText,
    mut start: TextPosition,
    mut end: TextPosition,
) -> Option<(TextPosition, TextPosition)> {
    let len = |unit: usize| flat.get(unit).map_or(0, |u| u.text.len());
    while start.unit < end.unit && start.offset >= len(start.unit) {
        start = TextPosition {
            unit: start.unit + 1,
            offset: 0,
        };
    }
    while end.unit > start.unit && end.offset == 0 {
        end = TextPosition {
            unit: end.unit - 1,
            offset: len(end.unit - 1),
        };
    }
    (start < end).then_some((start, end))
}

fn common_ancestor(doc: &Document, a: NodeId, b: NodeId) -> Option<NodeId> {
    let mut current = doc.parent(a);
    while let Some(candidate) = current {
        if doc.is_ancestor_of(candidate, b) {
            return Some(candidate);
        }
        current = doc.parent(candidate);
    }
    None
}

/// Climb from `node` to the child of `common` holding it, splitting every
/// ancestor that also holds content before `node`.
fn lift_start(doc: &mut Document, mut node: NodeId, common: NodeId) -> Option<NodeId> {
    while let Some(parent) = doc.parent(node) {
        if parent == common {
            return Some(node);
        }
        let index = doc.index_in_parent(node)?;
        node = if index == 0 {
            parent
        } else {
            split_after(doc, parent, index)?
        };
    }
    None
}

/// Climb from `node` to the child of `common` holding it, splitting every
/// ancestor that also holds content after `node`.
fn lift_end(doc: &mut Document, mut node: NodeId, common: NodeId) -> Option<NodeId> {
    while let Some(parent) = doc.parent(node) {
        if parent == common {
            return Some(node);
        }
        let index = doc.index_in_parent(node)?;
        if index + 1 < doc.children(parent).len() {
            split_after(doc, parent, index + 1)?;
        }
        node = parent;
    }
    None
}

/// Move `element`'s children from `index` on into a shallow copy inserted
/// right after it. The copy never takes the `id`.
fn split_after(doc: &mut Document, element: NodeId, index: usize) -> Option<NodeId> {
    let grandparent = doc.parent(element)?;
    let position = doc.index_in_parent(element)?;
    let copy = doc.clone_element_shell(element)?;
    doc.remove_attribute(copy, "id");
    doc.insert_child(grandparent, position + 1, copy);

    let moved = doc.children(element)[index..].to_vec();
    for child in moved {
        doc.append_child(copy, child);
    }
    Some(copy)
}

fn merge_adjacent_text(doc: &mut Document, parent: NodeId) {
    let mut index = 0;
    while index + 1 < doc.children(parent).len() {
        let children = doc.children(parent);
        let (left, right) = (children[index], children[index + 1]);
        let merged = match (doc.text(left), doc.text(right)) {
            (Some(a), Some(b)) => Some(format!("{a}{b}")),
            _ => None,
        };
        match merged {
            Some(merged) => {
                doc.set_text(left, merged);
                doc.detach(right);
            }
            None => index += 1,
        }
    }
}
