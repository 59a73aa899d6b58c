//! # Persistence
//!
//! Save records, save slots, and the per-chapter graph cache.
//!
//! ## Save format
//!
//! A save is a flat JSON object. Node references are external keys, indices
//! are strings, and any keys the engine does not recognise are carried
//! through untouched:
//!
//! ```json
//! {
//!   "version": 1,
//!   "storyId": "chapter-1",
//!   "currentNode": "S1",
//!   "history": ["R", "S1"],
//!   "historyIndex": "1",
//!   "choices": ["C1"],
//!   "choiceIndex": "1",
//!   "isStoryNode": true,
//!   "playerName": "Ada"
//! }
//! ```
//!
//! Loading resolves every key against the live graph and rebuilds the cursor,
//! or reports exactly what no longer matches. Nothing is silently repaired.

mod record;
mod slots;
mod storage;

pub use record::*;
pub use slots::*;
pub use storage::*;

use story_graph::{NodeStore, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph cache error: {0}")]
    Store(#[from] StoreError),

    #[error("all {max} save slots are in use")]
    SlotsFull { max: usize },

    #[error("no save in slot {0}")]
    NoSuchSlot(usize),

    #[error("save cannot be restored: {0}")]
    Reconstruction(#[from] ReconstructionError),
}

/// Last synchronized graph per chapter.
///
/// Feeding the cached graph back into the synchronizer keeps node IDs stable
/// across runs.
pub struct GraphCache<S: RecordStorage> {
    storage: S,
}

impl<S: RecordStorage> GraphCache<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Cached graph for `chapter`, or an empty store if none was saved.
    pub fn load(&self, chapter: &str) -> Result<NodeStore, PersistError> {
        match self.storage.read(&cache_key(chapter))? {
            Some(bytes) => Ok(NodeStore::from_cache_slice(&bytes)?),
            None => Ok(NodeStore::new()),
        }
    }

    pub fn store(&mut self, chapter: &str, store: &NodeStore) -> Result<(), PersistError> {
        let json = store.to_cache_json()?;
        self.storage.write(&cache_key(chapter), json.as_bytes())?;
        tracing::debug!(chapter, nodes = store.len(), "cached story graph");
        Ok(())
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

fn cache_key(chapter: &str) -> String {
    format!("{}.graph.json", sanitize_key(chapter))
}
