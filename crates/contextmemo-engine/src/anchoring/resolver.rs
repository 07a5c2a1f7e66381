//! Anchor resolver: relocate an [`Anchor`] in a possibly changed document.
//!
//! Three strategies run in a fixed order and the first success wins:
//!
//! 1. **Context window.** Slide a window of up to `max_window_units`
//!    consecutive text units over the flattened stream. Each window is
//!    whitespace-normalized and searched for the normalized selected text;
//!    a hit is accepted only when the prefix and suffix (when present) sit
//!    right next to it. Context is compared on collapsed text, except that
//!    whitespace may be present on one side only where text nodes meet or
//!    at the edges of the hit. Accepted hits are mapped back to raw
//!    positions, first by walking each unit's own collapsed characters,
//!    then (when whitespace runs crossing unit boundaries make that walk
//!    disagree) by finding the raw selected text in the raw window.
//! 2. **Structural.** Look up the stored start and end addresses and put
//!    the boundaries in each element's first text child, clamping the
//!    stored offsets. No text is verified at this tier.
//! 3. **Verbatim.** The first raw occurrence of the selected text inside a
//!    single text unit.
//!
//! Every candidate is validated before it is returned; an inconsistent one
//! is discarded and the search carries on. The per-strategy functions
//! report why they failed; [`resolve`] and [`resolve_flat`] fold all of
//! that into `None`.

use crate::anchoring::address::StructuralBoundary;
use crate::anchoring::anchor::Anchor;
use crate::anchoring::flatten::{FlatText, flatten};
use crate::anchoring::normalize::{
    char_to_byte_offset, collapse_whitespace, collapse_with_offsets, normalize_spaces,
};
use crate::anchoring::range::{DomPoint, InvalidRange, ResolvedRange, TextPosition};
use crate::dom::{Document, NodeId};

/// Default cap on the number of consecutive units in one search window.
pub const DEFAULT_MAX_WINDOW_UNITS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_window_units: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_window_units: DEFAULT_MAX_WINDOW_UNITS,
        }
    }
}

/// How a context-window hit was mapped back to raw positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mapping {
    /// Per-unit collapsed characters lined up with the normalized window
    Normalized,
    /// The raw selected text was found verbatim at the same place
    RawFallback,
}

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    ContextWindow { mapping: Mapping },
    Structural,
    Verbatim,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextWindow {
                mapping: Mapping::Normalized,
            } => write!(f, "context window"),
            Self::ContextWindow {
                mapping: Mapping::RawFallback,
            } => write!(f, "context window (raw fallback)"),
            Self::Structural => write!(f, "structural"),
            Self::Verbatim => write!(f, "verbatim"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub range: ResolvedRange,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("anchor has no selected text")]
    MalformedAnchor,
    #[error("selected text not found")]
    NoMatch,
    #[error("anchor has no structural address")]
    NoStructuralAddress,
    #[error("structural address {0} matches no element")]
    AddressNotFound(String),
    #[error("element at {0} has no text to anchor in")]
    NoTextBoundary(String),
    #[error("inconsistent range: {0}")]
    Inconsistent(#[from] InvalidRange),
}

/// Resolve `anchor` against the text under `root`.
///
/// The returned range indexes into `flatten(doc, root)`.
pub fn resolve(
    doc: &Document,
    root: NodeId,
    anchor: &Anchor,
    options: &ResolveOptions,
) -> Option<Resolution> {
    resolve_flat(doc, &flatten(doc, root), anchor, options)
}

/// Resolve `anchor` against an already flattened document.
pub fn resolve_flat(
    doc: &Document,
    flat: &FlatText,
    anchor: &Anchor,
    options: &ResolveOptions,
) -> Option<Resolution> {
    let outcome = resolve_context_window(flat, anchor, options)
        .or_else(|e| {
            log::debug!("Context window strategy failed for {:?}: {e}", anchor.selected_text);
            resolve_structural(doc, flat, anchor)
        })
        .or_else(|e| {
            log::debug!("Structural strategy failed for {:?}: {e}", anchor.selected_text);
            resolve_verbatim(flat, anchor)
        });

    match outcome {
        Ok(resolution) => {
            log::debug!(
                "Resolved {:?} via {} strategy",
                anchor.selected_text,
                resolution.strategy
            );
            Some(resolution)
        }
        Err(e) => {
            log::debug!("Verbatim strategy failed for {:?}: {e}", anchor.selected_text);
            None
        }
    }
}

/// Context-verified sliding window search.
pub fn resolve_context_window(
    flat: &FlatText,
    anchor: &Anchor,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let target = normalize_spaces(&anchor.selected_text);
    if target.is_empty() {
        return Err(ResolveError::MalformedAnchor);
    }
    let prefix = normalize_spaces(&anchor.prefix);
    let suffix = normalize_spaces(&anchor.suffix);
    let target_chars = target.chars().count();
    let units = flat.units();
    let max_units = options.max_window_units.max(1);

    for first in 0..units.len() {
        let mut raw = String::new();
        for last in first..units.len().min(first + max_units) {
            raw.push_str(&units[last].text);
            let window = tagged_window(flat, first, last);
            let normalized: String = window.iter().map(|&(_, ch)| ch).collect();
            if normalized.len() < target.len() {
                continue;
            }

            for pos in find_all(&normalized, &target) {
                let pos_chars = normalized[..pos].chars().count();
                if !context_matches(&window, pos_chars, target_chars, &prefix, &suffix) {
                    continue;
                }

                let walked =
                    map_normalized(flat, first, last, pos_chars, target_chars, &normalized, &target);
                let mapped = match walked {
                    Some(range) => Some((range, Mapping::Normalized)),
                    None => map_raw(flat, first, &raw, pos_chars, &anchor.selected_text)
                        .map(|range| (range, Mapping::RawFallback)),
                };
                let Some((range, mapping)) = mapped else {
                    log::debug!("Discarding unmappable hit in units {first}..={last}");
                    continue;
                };
                match range.validate(flat) {
                    Ok(()) => {
                        return Ok(Resolution {
                            range,
                            strategy: Strategy::ContextWindow { mapping },
                        });
                    }
                    Err(e) => log::debug!("Discarding hit in units {first}..={last}: {e}"),
                }
            }
        }
    }

    Err(ResolveError::NoMatch)
}

/// Structural address lookup. Accepts whatever the addresses point at.
pub fn resolve_structural(
    doc: &Document,
    flat: &FlatText,
    anchor: &Anchor,
) -> Result<Resolution, ResolveError> {
    let (Some(start), Some(end)) = (&anchor.structural_start, &anchor.structural_end) else {
        return Err(ResolveError::NoStructuralAddress);
    };
    let range = ResolvedRange::from_positions(
        boundary_position(doc, flat, start)?,
        boundary_position(doc, flat, end)?,
    );
    range.validate(flat)?;
    Ok(Resolution {
        range,
        strategy: Strategy::Structural,
    })
}

/// First raw occurrence of the selected text within a single unit.
pub fn resolve_verbatim(flat: &FlatText, anchor: &Anchor) -> Result<Resolution, ResolveError> {
    let needle = anchor.selected_text.as_str();
    if needle.trim().is_empty() {
        return Err(ResolveError::MalformedAnchor);
    }

    for (unit, flat_unit) in flat.units().iter().enumerate() {
        let Some(offset) = flat_unit.text.find(needle) else {
            continue;
        };
        let range = ResolvedRange {
            start_unit: unit,
            start_offset: offset,
            end_unit: unit,
            end_offset: offset + needle.len(),
        };
        match range.validate(flat) {
            Ok(()) => {
                return Ok(Resolution {
                    range,
                    strategy: Strategy::Verbatim,
                });
            }
            Err(e) => log::debug!("Discarding verbatim hit in unit {unit}: {e}"),
        }
    }

    Err(ResolveError::NoMatch)
}

/// Byte offsets of every occurrence of `needle`, overlapping ones included.
fn find_all<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let mut from = 0;
    std::iter::from_fn(move || {
        let found = from + haystack.get(from..)?.find(needle)?;
        from = found + haystack[found..].chars().next().map_or(1, char::len_utf8);
        Some(found)
    })
}

/// The window's text with whitespace collapsed across unit boundaries and
/// trimmed, each char tagged with the unit it came from. Equal, char for
/// char, to `normalize_spaces` of the raw window.
fn tagged_window(flat: &FlatText, first: usize, last: usize) -> Vec<(usize, char)> {
    let mut out: Vec<(usize, char)> = Vec::new();
    for unit in first..=last {
        for c in collapse_with_offsets(&flat.units()[unit].text) {
            if c.ch == ' ' && out.last().is_none_or(|&(_, prev)| prev == ' ') {
                continue;
            }
            out.push((unit, c.ch));
        }
    }
    if out.last().is_some_and(|&(_, ch)| ch == ' ') {
        out.pop();
    }
    out
}

/// Prefix and suffix must border the hit at char `pos`, `len` chars long.
fn context_matches(
    window: &[(usize, char)],
    pos: usize,
    len: usize,
    prefix: &str,
    suffix: &str,
) -> bool {
    (prefix.is_empty() || prefix_matches(window, pos, prefix))
        && (suffix.is_empty() || suffix_matches(window, pos + len, suffix))
}

/// True when the gap before `window[k]` is where two units meet, or an end
/// of the window.
fn is_join(window: &[(usize, char)], k: usize) -> bool {
    match (k.checked_sub(1).and_then(|i| window.get(i)), window.get(k)) {
        (Some(&(before, _)), Some(&(after, _))) => before != after,
        _ => true,
    }
}

/// Match `prefix` backwards from the gap at `edge`. Whitespace on one side
/// only is tolerated at unit joins and at `edge` itself.
fn prefix_matches(window: &[(usize, char)], edge: usize, prefix: &str) -> bool {
    let mut i = edge;
    let mut pattern = prefix.chars().rev().peekable();
    while let Some(&p) = pattern.peek() {
        match i.checked_sub(1).map(|k| window[k]) {
            Some((_, ch)) if ch == p => {
                i -= 1;
                pattern.next();
            }
            Some((_, ' ')) if i == edge || is_join(window, i) || is_join(window, i - 1) => i -= 1,
            _ if p == ' ' && (i == edge || is_join(window, i)) => {
                pattern.next();
            }
            _ => return false,
        }
    }
    true
}

/// Match `suffix` forwards from the gap at `edge`, with the same whitespace
/// tolerance as [`prefix_matches`].
fn suffix_matches(window: &[(usize, char)], edge: usize, suffix: &str) -> bool {
    let mut i = edge;
    let mut pattern = suffix.chars().peekable();
    while let Some(&p) = pattern.peek() {
        match window.get(i).copied() {
            Some((_, ch)) if ch == p => {
                i += 1;
                pattern.next();
            }
            Some((_, ' ')) if i == edge || is_join(window, i) || is_join(window, i + 1) => i += 1,
            _ if p == ' ' && (i == edge || is_join(window, i)) => {
                pattern.next();
            }
            _ => return false,
        }
    }
    true
}

/// Line the window's per-unit collapsed characters up with the normalized
/// window. Fails when the collapsed walk and the normalized text disagree,
/// which happens where whitespace runs meet at a unit boundary.
fn map_normalized(
    flat: &FlatText,
    first: usize,
    last: usize,
    pos_chars: usize,
    target_chars: usize,
    normalized: &str,
    target: &str,
) -> Option<ResolvedRange> {
    let units = flat.units();
    let chars: Vec<_> = (first..=last)
        .flat_map(|unit| {
            collapse_with_offsets(&units[unit].text)
                .into_iter()
                .map(move |c| (unit, c))
        })
        .collect();
    let leading = chars.iter().take_while(|(_, c)| c.ch == ' ').count();
    let walked: String = chars[leading..].iter().map(|(_, c)| c.ch).collect();
    if walked.trim_end() != normalized {
        return None;
    }

    let &(start_unit, start) = chars.get(leading + pos_chars)?;
    let &(end_unit, end) = chars.get(leading + pos_chars + target_chars.checked_sub(1)?)?;
    let range = ResolvedRange {
        start_unit,
        start_offset: start.raw_offset,
        end_unit,
        end_offset: end.raw_offset + end.raw_len,
    };

    (normalize_spaces(&range.text(flat)?) == target).then_some(range)
}

/// Find the raw selected text in the raw window at the place that
/// normalizes to `pos_chars`.
fn map_raw(
    flat: &FlatText,
    first: usize,
    raw: &str,
    pos_chars: usize,
    selected_text: &str,
) -> Option<ResolvedRange> {
    let window_start = flat.stream_offset(TextPosition {
        unit: first,
        offset: 0,
    })?;
    let leading_space = selected_text.len() - selected_text.trim_start().len();

    find_all(raw, selected_text).find_map(|at| {
        let normalized_at = collapse_whitespace(&raw[..at + leading_space])
            .trim_start()
            .chars()
            .count();
        if normalized_at != pos_chars {
            return None;
        }
        Some(ResolvedRange::from_positions(
            flat.position_at(window_start + at)?,
            flat.end_position_at(window_start + at + selected_text.len())?,
        ))
    })
}

/// Position for a stored boundary: the element's first text child, with
/// the char offset clamped to its length. Elements without a text child
/// use the element's own start.
fn boundary_position(
    doc: &Document,
    flat: &FlatText,
    boundary: &StructuralBoundary,
) -> Result<TextPosition, ResolveError> {
    let xpath = || boundary.address.to_xpath();
    let element = boundary
        .address
        .lookup(doc)
        .ok_or_else(|| ResolveError::AddressNotFound(xpath()))?;

    let first_text = doc
        .children(element)
        .iter()
        .copied()
        .find(|&child| doc.text(child).is_some_and(|text| !text.is_empty()));

    match first_text {
        Some(node) => {
            let unit = flat
                .unit_of(node)
                .ok_or_else(|| ResolveError::NoTextBoundary(xpath()))?;
            let text = flat.get(unit).map(|u| u.text.as_str()).unwrap_or_default();
            Ok(TextPosition {
                unit,
                offset: char_to_byte_offset(text, boundary.offset),
            })
        }
        None => flat
            .locate(doc, DomPoint::new(element, 0))
            .ok_or_else(|| ResolveError::NoTextBoundary(xpath())),
    }
}
