use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::note::{Note, NoteFilter};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access notes file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse notes file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where notes live. The anchoring core never touches this; callers hand
/// notes to it.
pub trait NoteStore {
    fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, StoreError>;

    /// Insert `note`, replacing any note with the same id.
    fn put(&mut self, note: Note) -> Result<(), StoreError>;

    /// Returns false when no note had this id.
    fn remove(&mut self, id: Uuid) -> Result<bool, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self
            .list(&NoteFilter::All)?
            .into_iter()
            .find(|note| note.id == id))
    }

    /// Change a note's text. The anchor is left alone.
    fn update_content(&mut self, id: Uuid, content: &str) -> Result<bool, StoreError> {
        let Some(mut note) = self.get(id)? else {
            return Ok(false);
        };
        note.content = content.to_string();
        self.put(note)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNoteStore {
    notes: Vec<Note>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteStore for MemoryNoteStore {
    fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .notes
            .iter()
            .filter(|note| filter.matches(note))
            .cloned()
            .collect())
    }

    fn put(&mut self, note: Note) -> Result<(), StoreError> {
        upsert(&mut self.notes, note);
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut self.notes, id))
    }
}

/// On-disk layout, matching the extension's storage: `{"notes": [...]}`
#[derive(Debug, Default, Serialize, Deserialize)]
struct NotesFile {
    #[serde(default)]
    notes: Vec<Note>,
}

/// Notes kept in a single JSON file, read and rewritten on every call.
#[derive(Debug, Clone)]
pub struct JsonNoteStore {
    path: PathBuf,
}

impl JsonNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Note>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: NotesFile = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(file.notes)
    }

    fn save(&self, notes: Vec<Note>) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        // Create parent directories if they don't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(&NotesFile { notes }).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(io_error)
    }
}

impl NoteStore for JsonNoteStore {
    fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|note| filter.matches(note))
            .collect())
    }

    fn put(&mut self, note: Note) -> Result<(), StoreError> {
        let mut notes = self.load()?;
        upsert(&mut notes, note);
        self.save(notes)
    }

    fn remove(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let mut notes = self.load()?;
        if !remove_by_id(&mut notes, id) {
            return Ok(false);
        }
        self.save(notes)?;
        Ok(true)
    }
}

fn upsert(notes: &mut Vec<Note>, note: Note) {
    match notes.iter_mut().find(|existing| existing.id == note.id) {
        Some(existing) => *existing = note,
        None => notes.push(note),
    }
}

fn remove_by_id(notes: &mut Vec<Note>, id: Uuid) -> bool {
    let before = notes.len();
    notes.retain(|note| note.id != id);
    notes.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::Anchor;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample(url: &str, content: &str) -> Note {
        Note::new(url, content, Anchor::from_text("quick brown fox"))
    }

    fn exercise_store(store: &mut dyn NoteStore) {
        let first = sample("https://example.com/a", "first");
        let second = sample("https://example.com/b", "second");
        store.put(first.clone()).unwrap();
        store.put(second.clone()).unwrap();

        assert_eq!(store.list(&NoteFilter::All).unwrap().len(), 2);
        assert_eq!(
            store
                .list(&NoteFilter::Url("https://example.com/b".into()))
                .unwrap(),
            vec![second.clone()]
        );

        // Put with an existing id replaces in place
        let mut edited = first.clone();
        edited.content = "first, edited".into();
        store.put(edited.clone()).unwrap();
        assert_eq!(store.list(&NoteFilter::All).unwrap(), vec![edited, second.clone()]);

        assert!(store.update_content(second.id, "second, edited").unwrap());
        let updated = store.get(second.id).unwrap().unwrap();
        assert_eq!(updated.content, "second, edited");
        assert_eq!(updated.locator, second.locator);
        assert!(!store.update_content(Uuid::new_v4(), "nobody").unwrap());

        assert!(store.remove(first.id).unwrap());
        assert!(!store.remove(first.id).unwrap());
        assert_eq!(store.list(&NoteFilter::All).unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store() {
        exercise_store(&mut MemoryNoteStore::new());
    }

    #[test]
    fn test_json_store() {
        let dir = TempDir::new().unwrap();
        exercise_store(&mut JsonNoteStore::new(dir.path().join("notes.json")));
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        // Given a path where nothing has been saved yet
        let dir = TempDir::new().unwrap();
        let store = JsonNoteStore::new(dir.path().join("notes.json"));

        // When listing
        let notes = store.list(&NoteFilter::All).unwrap();

        // Then the store is empty and no file was created
        assert!(notes.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_json_store_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("notes.json");
        let mut store = JsonNoteStore::new(&path);

        store.put(sample("u", "c")).unwrap();

        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"notes\""));
        assert!(written.contains("\"selectedText\""));
    }

    #[test]
    fn test_json_store_reports_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonNoteStore::new(&path).list(&NoteFilter::All);

        assert!(matches!(result, Err(StoreError::Parse { .. })));
        assert!(result.unwrap_err().to_string().contains("notes.json"));
    }
}
