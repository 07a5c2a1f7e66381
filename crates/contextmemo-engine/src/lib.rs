//! Anchor serialization and re-resolution for notes on web pages.
//!
//! - [`dom`]: arena document tree with HTML parsing and output
//! - [`anchoring`]: flattening, anchors, resolution and highlights
//! - [`notes`]: notes and injectable note stores
//! - [`restore`]: page-level annotate and restore flows

pub mod anchoring;
pub mod dom;
pub mod notes;
pub mod restore;

// Re-export key types for easier usage
pub use anchoring::{
    Anchor, AnchorOptions, FlatText, ResolveOptions, Resolution, ResolvedRange, Strategy,
    TextRange,
};
pub use dom::{Document, NodeId};
pub use notes::{JsonNoteStore, MemoryNoteStore, Note, NoteFilter, NoteStore, StoreError};
pub use restore::{RestoreReport, annotate, restore_highlights};
