//! Story Session - one chapter being played.
//!
//! Ties the pieces together for a game front end:
//! 1. **Open**: synchronize the authored source against the cached graph,
//!    lay it out, and start traversal at the root
//! 2. **Play**: read the current node, advance, select choices, go back
//! 3. **Save/Load**: map the cursor to and from a durable record
//!
//! `open` hands back the reconciliation report; the new graph cache is the
//! session's store, read with [`StorySession::store`] or taken with
//! [`StorySession::into_store`].

use story_graph::{AuthoredSource, NodeId, NodeStore, StoryNode};
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::layout::LayoutEngine;
use crate::persistence::{
    from_record, to_record, DurableRecord, PersistError, ReconstructionError, RecordStorage,
    SaveMeta, SaveSlots,
};
use crate::reveal::TextReveal;
use crate::synchronizer::{synchronize, SyncError, SyncReport};
use crate::traversal::{Step, TraversalCursor, TraversalEngine, TraversalError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to synchronize chapter: {0}")]
    Sync(#[from] SyncError),

    #[error("failed to start traversal: {0}")]
    Traversal(#[from] TraversalError),
}

pub struct StorySession {
    chapter: String,
    engine: TraversalEngine,
    meta: SaveMeta,
    reveal: TextReveal,
}

impl StorySession {
    /// Synchronize `source` against `prior_cache` and start playing.
    ///
    /// The report lists what reconciliation retained, created, and removed.
    pub fn open(
        chapter: impl Into<String>,
        source: &AuthoredSource,
        prior_cache: &NodeStore,
        config: &EngineConfig,
    ) -> Result<(Self, SyncReport), SessionError> {
        config.validate()?;
        let chapter = chapter.into();
        let synced = synchronize(source, prior_cache, &config.sync)?;

        let mut store = synced.store;
        let stats = LayoutEngine::new(config.layout.clone()).layout(&mut store);
        tracing::info!(
            chapter = %chapter,
            nodes = store.len(),
            detached = stats.detached,
            anomalies = synced.report.anomaly_count(),
            "opened chapter"
        );

        Ok((Self::new(chapter, store)?, synced.report))
    }

    /// Start playing an already synchronized graph.
    pub fn new(chapter: impl Into<String>, store: NodeStore) -> Result<Self, TraversalError> {
        let engine = TraversalEngine::start(store)?;
        let mut session = Self {
            chapter: chapter.into(),
            engine,
            meta: SaveMeta::default(),
            reveal: TextReveal::default(),
        };
        session.reset_reveal();
        Ok(session)
    }

    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    pub fn store(&self) -> &NodeStore {
        self.engine.store()
    }

    pub fn cursor(&self) -> &TraversalCursor {
        self.engine.cursor()
    }

    pub fn engine(&self) -> &TraversalEngine {
        &self.engine
    }

    pub fn current(&self) -> Option<&StoryNode> {
        self.engine.current()
    }

    pub fn current_text(&self) -> &str {
        self.current().map_or("", |n| n.text.as_str())
    }

    pub fn current_label(&self) -> &str {
        self.current().map_or("", |n| n.label.as_str())
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current().and_then(|n| n.image.as_deref())
    }

    /// Choices to present at the current node.
    pub fn choices(&self) -> Vec<&StoryNode> {
        let store = self.engine.store();
        self.engine
            .choices()
            .into_iter()
            .filter_map(|id| store.get(id))
            .collect()
    }

    pub fn has_more(&self) -> bool {
        self.engine.has_more()
    }

    pub fn is_game_over(&self) -> bool {
        self.engine.is_game_over()
    }

    pub fn is_end_of_chapter(&self) -> bool {
        self.engine.is_end_of_chapter()
    }

    pub fn is_end_of_part(&self) -> bool {
        self.engine.is_end_of_part()
    }

    pub fn advance(&mut self) -> Step {
        let step = self.engine.advance();
        self.after(step)
    }

    pub fn select(&mut self, choice: NodeId) -> Step {
        let step = self.engine.select_choice(choice);
        self.after(step)
    }

    pub fn go_back(&mut self) -> Step {
        let step = self.engine.go_back();
        self.after(step)
    }

    pub fn go_back_from_game_over(&mut self) -> Step {
        let step = self.engine.go_back_from_game_over();
        self.after(step)
    }

    pub fn meta(&self) -> &SaveMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut SaveMeta {
        &mut self.meta
    }

    pub fn reveal(&self) -> &TextReveal {
        &self.reveal
    }

    pub fn reveal_mut(&mut self) -> &mut TextReveal {
        &mut self.reveal
    }

    /// Snapshot the playthrough as a durable record.
    pub fn save(&mut self) -> DurableRecord {
        self.meta.stamp_now();
        to_record(&self.chapter, self.engine.cursor(), self.engine.store(), &self.meta)
    }

    /// Restore a playthrough from `record`.
    ///
    /// On error the session is left exactly as it was.
    pub fn load(&mut self, record: &DurableRecord) -> Result<(), ReconstructionError> {
        if record.story_id != self.chapter {
            return Err(ReconstructionError::WrongStory {
                expected: self.chapter.clone(),
                found: record.story_id.clone(),
            });
        }

        let cursor = from_record(record, self.engine.store())?;
        self.engine.replace_cursor(cursor)?;
        self.meta = record.meta.clone();
        self.reset_reveal();
        tracing::info!(
            chapter = %self.chapter,
            node = %record.current_node,
            "loaded save"
        );
        Ok(())
    }

    /// Save into the next free slot and return its number.
    pub fn save_to_slot<S: RecordStorage>(
        &mut self,
        slots: &mut SaveSlots<S>,
    ) -> Result<usize, PersistError> {
        let record = self.save();
        slots.create(&record)
    }

    /// Restore the playthrough stored in `slot`.
    pub fn load_slot<S: RecordStorage>(
        &mut self,
        slots: &SaveSlots<S>,
        slot: usize,
    ) -> Result<(), PersistError> {
        let record = slots.load(slot)?;
        self.load(&record)?;
        Ok(())
    }

    /// Give back the synchronized graph, for writing to the cache.
    pub fn into_store(self) -> NodeStore {
        self.engine.into_parts().0
    }

    fn after(&mut self, step: Step) -> Step {
        if step.is_moved() {
            self.reset_reveal();
        }
        step
    }

    fn reset_reveal(&mut self) {
        let text = self.current_text().to_string();
        self.reveal.reset(text);
    }
}
