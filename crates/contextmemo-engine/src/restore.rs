//! Page-level glue: annotate a selection, and put every note for a page
//! back on it.

use uuid::Uuid;

use crate::anchoring::{
    AnchorOptions, ResolveOptions, SerializeError, Strategy, TextRange, apply_highlight, flatten,
    is_highlighted, resolve_flat, serialize_range, update_highlight_content,
};
use crate::dom::Document;
use crate::notes::Note;

/// What happened to each note during [`restore_highlights`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub applied: Vec<(Uuid, Strategy)>,
    /// No strategy found the note's text, or the range could not be wrapped
    pub unresolved: Vec<Uuid>,
    /// Already highlighted on this page
    pub skipped: Vec<Uuid>,
}

/// Resolve and highlight every note in `notes`. Never fails; notes that
/// cannot be placed are listed as unresolved.
pub fn restore_highlights(
    doc: &mut Document,
    notes: &[Note],
    options: &ResolveOptions,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for note in notes {
        let note_id = note.id.to_string();
        if is_highlighted(doc, &note_id) {
            report.skipped.push(note.id);
            continue;
        }

        // Every applied highlight changes the tree, so flatten afresh
        let flat = flatten(doc, doc.body());
        let Some(resolution) = resolve_flat(doc, &flat, &note.anchor(), options) else {
            log::debug!("No match for note {note_id}");
            report.unresolved.push(note.id);
            continue;
        };

        match apply_highlight(doc, &flat, &resolution.range, &note_id) {
            Ok(_) => {
                update_highlight_content(doc, &note_id, &note.content);
                report.applied.push((note.id, resolution.strategy));
            }
            Err(e) => {
                log::warn!("Could not highlight note {note_id}: {e}");
                report.unresolved.push(note.id);
            }
        }
    }

    log::info!(
        "Restored {} of {} notes ({} already highlighted)",
        report.applied.len(),
        notes.len(),
        report.skipped.len()
    );
    report
}

/// Create a note for `range`. The document is not modified.
pub fn annotate(
    doc: &Document,
    range: &TextRange,
    url: &str,
    content: &str,
    options: &AnchorOptions,
) -> Result<Note, SerializeError> {
    let anchor = serialize_range(doc, range, options)?;
    Ok(Note::new(url, content, anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::{CONTENT_ATTRIBUTE, Mapping, find_highlights};
    use pretty_assertions::assert_eq;

    const PAGE: &str = "<body><p>The quick brown fox jumps. The quick brown fox sleeps.</p></body>";

    fn note_for(page: &str, needle: &str, occurrence: usize, content: &str) -> Note {
        let doc = Document::parse_html(page);
        let range = TextRange::find_text(&doc, needle, occurrence).unwrap();
        annotate(&doc, &range, "https://example.com/", content, &AnchorOptions::default())
            .unwrap()
    }

    #[test]
    fn test_annotate_builds_note() {
        let note = note_for(PAGE, "quick brown fox", 1, "the sleepy one");

        assert_eq!(note.url, "https://example.com/");
        assert_eq!(note.content, "the sleepy one");
        assert_eq!(note.selected_text, "quick brown fox");
        assert_eq!(note.locator.unwrap().suffix, " sleeps.");
    }

    #[test]
    fn test_restore_applies_and_skips_duplicates() {
        let notes = vec![
            note_for(PAGE, "quick brown fox", 1, "second"),
            note_for(PAGE, "jumps", 0, "verb"),
        ];
        let mut doc = Document::parse_html(PAGE);

        let report = restore_highlights(&mut doc, &notes, &ResolveOptions::default());
        let context = Strategy::ContextWindow {
            mapping: Mapping::Normalized,
        };
        assert_eq!(
            report.applied,
            vec![(notes[0].id, context), (notes[1].id, context)]
        );

        let marker = find_highlights(&doc, &notes[0].id.to_string())[0];
        assert_eq!(doc.text_content(marker), "quick brown fox");
        assert_eq!(doc.attribute(marker, CONTENT_ATTRIBUTE), Some("second"));
        assert_eq!(doc.text_content(doc.body()), "The quick brown fox jumps. The quick brown fox sleeps.");

        let again = restore_highlights(&mut doc, &notes, &ResolveOptions::default());
        assert!(again.applied.is_empty());
        assert_eq!(again.skipped, vec![notes[0].id, notes[1].id]);
    }

    #[test]
    fn test_restore_reports_missing_text() {
        let note = note_for(PAGE, "jumps", 0, "gone soon");
        let mut doc = Document::parse_html("<body><div>Entirely different page</div></body>");

        let report = restore_highlights(&mut doc, &[note.clone()], &ResolveOptions::default());

        assert!(report.applied.is_empty());
        assert_eq!(report.unresolved, vec![note.id]);
    }

    #[test]
    fn test_restore_note_without_locator() {
        let mut note = note_for(PAGE, "sleeps", 0, "legacy");
        note.locator = None;
        let mut doc = Document::parse_html(PAGE);

        let report = restore_highlights(&mut doc, &[note.clone()], &ResolveOptions::default());

        assert_eq!(report.applied.len(), 1);
        let marker = find_highlights(&doc, &note.id.to_string())[0];
        assert_eq!(doc.text_content(marker), "sleeps");
    }
}
