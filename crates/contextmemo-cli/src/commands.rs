use anyhow::{Context, Result, bail};
use contextmemo_engine::anchoring::{AnchorOptions, ResolveOptions, TextRange, flatten};
use contextmemo_engine::{Document, Note, NoteFilter, NoteStore, RestoreReport, annotate};
use uuid::Uuid;

/// Anchor the `occurrence`th match of `text` on the page and save a note.
pub fn annotate_page(
    store: &mut dyn NoteStore,
    page: &str,
    url: &str,
    text: &str,
    occurrence: usize,
    content: &str,
    options: &AnchorOptions,
) -> Result<Note> {
    let doc = Document::parse_html(page);
    let Some(range) = TextRange::find_text(&doc, text, occurrence) else {
        bail!("Text {text:?} (occurrence {occurrence}) not found on the page");
    };
    let note = annotate(&doc, &range, url, content, options)?;
    store.put(note.clone())?;
    log::info!("Saved note {} for {url}", note.id);
    Ok(note)
}

/// Highlight every saved note for `url`; returns the rewritten page.
pub fn restore_page(
    store: &dyn NoteStore,
    page: &str,
    url: &str,
    options: &ResolveOptions,
) -> Result<(String, RestoreReport)> {
    let notes = store.list(&NoteFilter::Url(url.to_string()))?;
    let mut doc = Document::parse_html(page);
    let report = contextmemo_engine::restore_highlights(&mut doc, &notes, options);
    Ok((doc.to_html(), report))
}

pub fn edit_note(store: &mut dyn NoteStore, id: Uuid, content: &str) -> Result<()> {
    if !store.update_content(id, content)? {
        bail!("No note with id {id}");
    }
    Ok(())
}

pub fn delete_note(store: &mut dyn NoteStore, id: Uuid) -> Result<()> {
    if !store.remove(id)? {
        bail!("No note with id {id}");
    }
    Ok(())
}

/// One line per note: id, url, quoted selection and the note text.
pub fn format_note(note: &Note) -> String {
    let created = note
        .created_at_utc()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!(
        "{}  {}  {}  {:?}  {}",
        note.id, created, note.url, note.selected_text, note.content
    )
}

/// The page's body text leaves, numbered in document order.
pub fn flatten_page(page: &str) -> Vec<String> {
    let doc = Document::parse_html(page);
    flatten(&doc, doc.body())
        .units()
        .iter()
        .map(|unit| format!("{:>4}  {:?}", unit.order, unit.text))
        .collect()
}

pub fn read_page(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page {}", path.display()))
}
