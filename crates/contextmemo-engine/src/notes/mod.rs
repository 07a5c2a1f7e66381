//! Notes and their storage.
//!
//! Stores are injected wherever notes are needed; nothing in
//! [`crate::anchoring`] depends on this module.

pub mod note;
pub mod store;

pub use note::*;
pub use store::*;
