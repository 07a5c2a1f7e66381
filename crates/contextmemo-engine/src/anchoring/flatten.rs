//! Text-node flattener.
//!
//! Produces the ordered list of text leaves under a root. The concatenation
//! of their contents is the "document text stream" that anchoring searches.
//! The result is a snapshot: it copies the text, so it stays valid (but
//! stale) when the document is mutated afterwards.

use std::collections::HashMap;

use crate::anchoring::range::{DomPoint, TextPosition};
use crate::dom::{Document, NodeId, NodeKind};

/// One text leaf in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTextUnit {
    pub node: NodeId,
    pub text: String,
    pub order: usize,
}

/// Flattened view of every text leaf under a root.
#[derive(Debug, Clone, Default)]
pub struct FlatText {
    root: Option<NodeId>,
    units: Vec<FlatTextUnit>,
    /// Stream byte offset at which each unit starts
    starts: Vec<usize>,
    by_node: HashMap<NodeId, usize>,
}

/// Walk `root` depth-first, pre-order, collecting every text leaf,
/// whitespace-only ones included.
pub fn flatten(doc: &Document, root: NodeId) -> FlatText {
    let mut flat = FlatText {
        root: Some(root),
        ..FlatText::default()
    };
    let mut offset = 0;

    for id in doc.descendants(root) {
        let Some(NodeKind::Text(content)) = doc.kind(id) else {
            continue;
        };
        let order = flat.units.len();
        flat.by_node.insert(id, order);
        flat.starts.push(offset);
        offset += content.len();
        flat.units.push(FlatTextUnit {
            node: id,
            text: content.clone(),
            order,
        });
    }

    flat
}

impl FlatText {
    pub fn units(&self) -> &[FlatTextUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FlatTextUnit> {
        self.units.get(index)
    }

    /// Index of the unit backed by `node`.
    pub fn unit_of(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    /// The whole text stream.
    pub fn text(&self) -> String {
        self.units.iter().map(|u| u.text.as_str()).collect()
    }

    /// Total stream length in bytes.
    pub fn text_len(&self) -> usize {
        self.starts.last().copied().unwrap_or(0)
            + self.units.last().map(|u| u.text.len()).unwrap_or(0)
    }

    /// Stream offset of a position.
    pub fn stream_offset(&self, position: TextPosition) -> Option<usize> {
        let start = self.starts.get(position.unit)?;
        Some(start + position.offset)
    }

    /// Position of a stream offset, preferring the start of a unit when the
    /// offset sits on a boundary.
    pub fn position_at(&self, stream_offset: usize) -> Option<TextPosition> {
        let found = self.units.iter().enumerate().find(|(i, unit)| {
            let start = self.starts[*i];
            start <= stream_offset && stream_offset < start + unit.text.len()
        });
        match found {
            Some((unit, _)) => Some(TextPosition {
                unit,
                offset: stream_offset - self.starts[unit],
            }),
            None => self.end_position_at(stream_offset),
        }
    }

    /// Position of a stream offset, preferring the end of a unit when the
    /// offset sits on a boundary.
    pub fn end_position_at(&self, stream_offset: usize) -> Option<TextPosition> {
        if stream_offset == 0 {
            return (!self.units.is_empty()).then_some(TextPosition { unit: 0, offset: 0 });
        }
        self.units.iter().enumerate().find_map(|(unit, u)| {
            let start = self.starts[unit];
            (start < stream_offset && stream_offset <= start + u.text.len()).then(|| TextPosition {
                unit,
                offset: stream_offset - start,
            })
        })
    }

    /// Text between two positions, or `None` when either is out of bounds,
    /// off a char boundary, or they are reversed.
    pub fn slice(&self, start: TextPosition, end: TextPosition) -> Option<String> {
        if start > end {
            return None;
        }
        if start.unit == end.unit {
            return self
                .get(start.unit)?
                .text
                .get(start.offset..end.offset)
                .map(str::to_string);
        }
        let head = self.get(start.unit)?.text.get(start.offset..)?;
        let tail = self.get(end.unit)?.text.get(..end.offset)?;
        let mut out = head.to_string();
        for unit in &self.units[start.unit + 1..end.unit] {
            out.push_str(&unit.text);
        }
        out.push_str(tail);
        Some(out)
    }

    /// Map a DOM boundary point onto the stream.
    ///
    /// Text containers use the point's byte offset directly. Element
    /// containers follow DOM semantics (offset = child index) and resolve to
    /// the first text unit at or after that child.
    pub fn locate(&self, doc: &Document, point: DomPoint) -> Option<TextPosition> {
        match doc.kind(point.container)? {
            NodeKind::Text(content) => {
                let unit = self.unit_of(point.container)?;
                content
                    .is_char_boundary(point.offset)
                    .then_some(TextPosition {
                        unit,
                        offset: point.offset,
                    })
            }
            NodeKind::Element(data) => {
                let root = self.root?;
                let preorder: HashMap<NodeId, usize> = doc
                    .descendants(root)
                    .enumerate()
                    .map(|(i, id)| (id, i))
                    .collect();
                let element_pre = *preorder.get(&point.container)?;

                // First pre-order index that lies at or beyond the boundary
                let boundary = match data.children.get(point.offset) {
                    Some(child) => *preorder.get(child)?,
                    None if point.offset == data.children.len() => {
                        element_pre + doc.descendants(point.container).count()
                    }
                    None => return None,
                };

                let next_unit = self
                    .units
                    .iter()
                    .position(|u| preorder.get(&u.node).is_some_and(|&pre| pre >= boundary));
                match next_unit {
                    Some(unit) => Some(TextPosition { unit, offset: 0 }),
                    None => {
                        let last = self.units.len().checked_sub(1)?;
                        Some(TextPosition {
                            unit: last,
                            offset: self.units[last].text.len(),
                        })
                    }
                }
            }
        }
    }
}
