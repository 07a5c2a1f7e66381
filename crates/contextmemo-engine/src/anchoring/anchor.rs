//! The portable anchor record and its persisted JSON shape.

use serde::{Deserialize, Serialize};

use crate::anchoring::address::{StructuralAddress, StructuralBoundary};

/// Durable locator for a text span.
///
/// Serializes as the flat persisted shape
/// `{selectedText, prefix, suffix, xpathStart, xpathEnd, startOffset, endOffset}`.
/// Reading is lenient: missing context is empty, and structural fields that
/// are absent or unreadable leave the boundary unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersistedAnchor", into = "PersistedAnchor")]
pub struct Anchor {
    pub selected_text: String,
    pub prefix: String,
    pub suffix: String,
    pub structural_start: Option<StructuralBoundary>,
    pub structural_end: Option<StructuralBoundary>,
}

impl Anchor {
    /// Anchor carrying only the text, as used for notes saved without a
    /// locator.
    pub fn from_text(selected_text: impl Into<String>) -> Self {
        Self {
            selected_text: selected_text.into(),
            prefix: String::new(),
            suffix: String::new(),
            structural_start: None,
            structural_end: None,
        }
    }

    pub fn has_context(&self) -> bool {
        !self.prefix.is_empty() || !self.suffix.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAnchor {
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

impl From<Anchor> for PersistedAnchor {
    fn from(anchor: Anchor) -> Self {
        let (xpath_start, start_offset) = split_boundary(anchor.structural_start);
        let (xpath_end, end_offset) = split_boundary(anchor.structural_end);
        Self {
            selected_text: anchor.selected_text,
            prefix: anchor.prefix,
            suffix: anchor.suffix,
            xpath_start,
            xpath_end,
            start_offset,
            end_offset,
        }
    }
}

impl From<PersistedAnchor> for Anchor {
    fn from(persisted: PersistedAnchor) -> Self {
        Self {
            structural_start: join_boundary(persisted.xpath_start.as_deref(), persisted.start_offset),
            structural_end: join_boundary(persisted.xpath_end.as_deref(), persisted.end_offset),
            selected_text: persisted.selected_text,
            prefix: persisted.prefix,
            suffix: persisted.suffix,
        }
    }
}

fn split_boundary(boundary: Option<StructuralBoundary>) -> (Option<String>, Option<usize>) {
    match boundary {
        Some(boundary) => (Some(boundary.address.to_xpath()), Some(boundary.offset)),
        None => (None, None),
    }
}

fn join_boundary(xpath: Option<&str>, offset: Option<usize>) -> Option<StructuralBoundary> {
    let xpath = xpath.filter(|x| !x.trim().is_empty())?;
    match xpath.parse::<StructuralAddress>() {
        Ok(address) => Some(StructuralBoundary {
            address,
            offset: offset.unwrap_or(0),
        }),
        Err(e) => {
            log::warn!("Ignoring unreadable structural address {xpath:?}: {e}");
            None
        }
    }
}
