//! Local persistence for the study dataset.
//!
//! The dataset is stored as one JSON value under a fixed key and replaced
//! wholesale on every save. Interview drafts live under their own
//! `draft_<participantId>` keys and are not touched by `clear_all`.

pub mod backend;
pub mod error;
pub mod local;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use error::StoreError;
pub use local::{draft_key, LocalStore, DATASET_KEY};
