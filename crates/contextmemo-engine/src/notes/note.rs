use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchoring::Anchor;

/// A note attached to a span of text on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub url: String,
    pub content: String,
    pub selected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<Anchor>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

impl Note {
    pub fn new(url: impl Into<String>, content: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            content: content.into(),
            selected_text: anchor.selected_text.clone(),
            locator: Some(anchor),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// The anchor to resolve: the stored locator, or a text-only anchor for
    /// notes saved without one.
    pub fn anchor(&self) -> Anchor {
        self.locator
            .clone()
            .unwrap_or_else(|| Anchor::from_text(self.selected_text.clone()))
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NoteFilter {
    #[default]
    All,
    /// Notes saved on exactly this URL
    Url(String),
    /// Case-insensitive search over content and selected text
    Search(String),
}

impl NoteFilter {
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            Self::All => true,
            Self::Url(url) => note.url == *url,
            Self::Search(query) => {
                let query = query.trim().to_lowercase();
                query.is_empty()
                    || format!("{}{}", note.content, note.selected_text)
                        .to_lowercase()
                        .contains(&query)
            }
        }
    }
}
