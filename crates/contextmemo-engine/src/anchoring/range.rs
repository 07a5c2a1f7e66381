//! Range types: DOM-style selections and positions in the flattened stream.

use crate::anchoring::flatten::{FlatText, flatten};
use crate::dom::{Document, NodeId};

/// A DOM boundary point. For text containers `offset` is a byte offset
/// into the text; for element containers it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPoint {
    pub container: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }
}

/// A live selection, shaped like a DOM `Range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

impl TextRange {
    pub fn new(start: DomPoint, end: DomPoint) -> Self {
        Self { start, end }
    }

    /// The selected text, like `Range.toString()`. Works inside detached
    /// subtrees too. `None` when a boundary is invalid, the boundaries sit
    /// in different trees, or they are reversed.
    pub fn text(&self, doc: &Document) -> Option<String> {
        let flat = flatten(doc, doc.tree_root(self.start.container));
        let start = flat.locate(doc, self.start)?;
        let end = flat.locate(doc, self.end)?;
        flat.slice(start, end)
    }

    /// Select the `occurrence`th (0-based) appearance of `needle` in the
    /// body's text stream. The match may span several text nodes.
    pub fn find_text(doc: &Document, needle: &str, occurrence: usize) -> Option<TextRange> {
        if needle.is_empty() {
            return None;
        }
        let flat = flatten(doc, doc.body());
        let stream = flat.text();
        let (offset, _) = stream.match_indices(needle).nth(occurrence)?;
        let range = ResolvedRange::from_positions(
            flat.position_at(offset)?,
            flat.end_position_at(offset + needle.len())?,
        );
        range.to_text_range(&flat)
    }
}

/// A position in the flattened stream: unit index plus byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPosition {
    pub unit: usize,
    pub offset: usize,
}

/// Why a [`ResolvedRange`] cannot be used against a flattened stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRange {
    #[error("unit {unit} is out of bounds")]
    UnitOutOfBounds { unit: usize },
    #[error("offset {offset} is not a char boundary of unit {unit}")]
    BadOffset { unit: usize, offset: usize },
    #[error("start is after end")]
    Reversed,
}

/// Start and end positions within the flattened stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedRange {
    pub start_unit: usize,
    pub start_offset: usize,
    pub end_unit: usize,
    pub end_offset: usize,
}

impl ResolvedRange {
    pub fn from_positions(start: TextPosition, end: TextPosition) -> Self {
        Self {
            start_unit: start.unit,
            start_offset: start.offset,
            end_unit: end.unit,
            end_offset: end.offset,
        }
    }

    pub fn start(&self) -> TextPosition {
        TextPosition {
            unit: self.start_unit,
            offset: self.start_offset,
        }
    }

    pub fn end(&self) -> TextPosition {
        TextPosition {
            unit: self.end_unit,
            offset: self.end_offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start() == self.end()
    }

    /// Check the range is internally consistent with `flat`: both ends
    /// exist, sit on char boundaries, and start ≤ end.
    pub fn validate(&self, flat: &FlatText) -> Result<(), InvalidRange> {
        for position in [self.start(), self.end()] {
            let unit = flat.get(position.unit).ok_or(InvalidRange::UnitOutOfBounds {
                unit: position.unit,
            })?;
            if !unit.text.is_char_boundary(position.offset) {
                return Err(InvalidRange::BadOffset {
                    unit: position.unit,
                    offset: position.offset,
                });
            }
        }
        if self.start() > self.end() {
            return Err(InvalidRange::Reversed);
        }
        Ok(())
    }

    /// The text this range covers.
    pub fn text(&self, flat: &FlatText) -> Option<String> {
        flat.slice(self.start(), self.end())
    }

    /// Map back onto DOM boundary points (text containers, byte offsets).
    pub fn to_text_range(&self, flat: &FlatText) -> Option<TextRange> {
        self.validate(flat).ok()?;
        let start = flat.get(self.start_unit)?;
        let end = flat.get(self.end_unit)?;
        Some(TextRange {
            start: DomPoint::new(start.node, self.start_offset),
            end: DomPoint::new(end.node, self.end_offset),
        })
    }
}
