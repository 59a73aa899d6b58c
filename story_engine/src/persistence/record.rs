//! Durable save records and the cursor <-> record mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use story_graph::{NodeId, NodeStore};
use thiserror::Error;

use crate::traversal::{check_cursor, TraversalCursor, TraversalError};

/// Current save record version. Records without a version are version 1.
pub const SAVE_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    1
}

fn zero_index() -> String {
    "0".to_string()
}

/// Game-level data carried by a save that the story engine does not
/// interpret.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMeta {
    /// Completion percentage shown on the load screen.
    #[serde(default)]
    pub progress: f32,

    #[serde(default)]
    pub playtime_seconds: u64,

    /// RFC 3339 timestamp of the save.
    #[serde(default)]
    pub saved_at: String,

    #[serde(default)]
    pub player_name: String,

    #[serde(default)]
    pub player_background: String,

    /// Any other keys found in the record, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SaveMeta {
    /// Set `saved_at` to the current time.
    pub fn stamp_now(&mut self) {
        self.saved_at = chrono::Utc::now().to_rfc3339();
    }
}

/// One save slot's contents.
///
/// Node references are stored by external key so that a save survives
/// content edits as long as the keys do not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableRecord {
    #[serde(default = "legacy_version")]
    pub version: u32,

    /// Chapter the save belongs to.
    pub story_id: String,

    pub current_node: String,

    pub history: Vec<String>,

    /// Integer encoded as a string.
    pub history_index: String,

    #[serde(rename = "choices", default)]
    pub choice_ledger: Vec<String>,

    /// Integer encoded as a string.
    #[serde(default = "zero_index")]
    pub choice_index: String,

    pub is_story_node: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abandoned_choice: Option<String>,

    #[serde(flatten)]
    pub meta: SaveMeta,
}

impl DurableRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Reasons a save record cannot be turned back into a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructionError {
    #[error("save version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("save belongs to story '{found}', expected '{expected}'")]
    WrongStory { expected: String, found: String },

    #[error("{field} refers to '{name}', which is no longer in the story")]
    DanglingReference { field: &'static str, name: String },

    #[error("{field} is not an index: '{value}'")]
    MalformedIndex { field: &'static str, value: String },

    #[error("{field} {index} is out of range for length {len}")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        len: usize,
    },

    #[error("save has an empty history")]
    EmptyHistory,

    #[error("current node '{current}' does not match history entry '{expected}'")]
    CurrentMismatch { current: String, expected: String },

    #[error("restored cursor rejected: {0}")]
    Rejected(#[from] TraversalError),
}

/// Map a cursor to a durable record.
///
/// Node IDs are written as external keys. An ID missing from `store` is
/// written as the raw ID and will not resolve on load.
pub fn to_record(
    story_id: &str,
    cursor: &TraversalCursor,
    store: &NodeStore,
    meta: &SaveMeta,
) -> DurableRecord {
    let name = |id: NodeId| match store.get(id) {
        Some(node) => node.external_key.clone(),
        None => {
            tracing::warn!(node = %id, "saving a node that is not in the story graph");
            id.to_string()
        }
    };

    DurableRecord {
        version: SAVE_VERSION,
        story_id: story_id.to_string(),
        current_node: name(cursor.current_node()),
        history: cursor.history().iter().map(|id| name(*id)).collect(),
        history_index: cursor.history_index().to_string(),
        choice_ledger: cursor.choice_ledger().iter().map(|id| name(*id)).collect(),
        choice_index: cursor.choice_index().to_string(),
        is_story_node: cursor.is_story_node(),
        abandoned_choice: cursor.abandoned_choice().map(name),
        meta: meta.clone(),
    }
}

/// Rebuild a cursor from a durable record against the live store.
///
/// Every name is resolved by external key. Nothing is repaired: a name the
/// store no longer knows is an error, and the caller decides what to do.
pub fn from_record(
    record: &DurableRecord,
    store: &NodeStore,
) -> Result<TraversalCursor, ReconstructionError> {
    if record.version > SAVE_VERSION {
        return Err(ReconstructionError::UnsupportedVersion {
            found: record.version,
            supported: SAVE_VERSION,
        });
    }

    let resolve = |field: &'static str, name: &str| {
        store
            .find_by_key(name)
            .map(|n| n.id)
            .ok_or_else(|| ReconstructionError::DanglingReference {
                field,
                name: name.to_string(),
            })
    };

    if record.history.is_empty() {
        return Err(ReconstructionError::EmptyHistory);
    }

    let history = record
        .history
        .iter()
        .map(|name| resolve("history", name))
        .collect::<Result<Vec<_>, _>>()?;
    let choice_ledger = record
        .choice_ledger
        .iter()
        .map(|name| resolve("choices", name))
        .collect::<Result<Vec<_>, _>>()?;
    let current_node = resolve("currentNode", &record.current_node)?;
    let abandoned_choice = record
        .abandoned_choice
        .as_deref()
        .map(|name| resolve("abandonedChoice", name))
        .transpose()?;

    let history_index = parse_index("historyIndex", &record.history_index)?;
    if history_index >= history.len() {
        return Err(ReconstructionError::IndexOutOfRange {
            field: "historyIndex",
            index: history_index,
            len: history.len(),
        });
    }

    let choice_index = parse_index("choiceIndex", &record.choice_index)?;
    if choice_index > choice_ledger.len() {
        return Err(ReconstructionError::IndexOutOfRange {
            field: "choiceIndex",
            index: choice_index,
            len: choice_ledger.len(),
        });
    }

    if history[history_index] != current_node {
        return Err(ReconstructionError::CurrentMismatch {
            current: record.current_node.clone(),
            expected: record.history[history_index].clone(),
        });
    }

    let is_story_node = store.choices_at(current_node).is_empty();
    if is_story_node != record.is_story_node {
        tracing::debug!(
            node = %record.current_node,
            saved = record.is_story_node,
            derived = is_story_node,
            "display mode changed since save"
        );
    }

    let cursor = TraversalCursor {
        current_node,
        history,
        history_index,
        choice_ledger,
        choice_index,
        is_story_node,
        abandoned_choice,
    };
    check_cursor(store, &cursor)?;
    Ok(cursor)
}

fn parse_index(field: &'static str, value: &str) -> Result<usize, ReconstructionError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ReconstructionError::MalformedIndex {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synchronizer::{synchronize, SyncOptions};
    use crate::traversal::TraversalEngine;
    use proptest::prelude::*;
    use story_graph::{AuthoredRecord, AuthoredSource};

    fn source() -> AuthoredSource {
        AuthoredSource::new(vec![
            AuthoredRecord::node("R").with_choices(["C1", "C2"]).root(),
            AuthoredRecord::choice("C1").with_nodes(["S1"]),
            AuthoredRecord::choice("C2").with_nodes(["S2"]),
            AuthoredRecord::node("S1").with_nodes(["S3"]),
            AuthoredRecord::node("S2").game_over(),
            AuthoredRecord::node("S3").end_of_chapter(),
        ])
    }

    fn engine() -> TraversalEngine {
        let store = synchronize(&source(), &NodeStore::new(), &SyncOptions::default())
            .unwrap()
            .store;
        TraversalEngine::start(store).unwrap()
    }

    fn id(engine: &TraversalEngine, key: &str) -> NodeId {
        engine.store().find_by_key(key).map(|n| n.id).unwrap()
    }

    fn meta() -> SaveMeta {
        let mut meta = SaveMeta {
            progress: 42.5,
            playtime_seconds: 3600,
            saved_at: "2024-03-01T12:00:00+00:00".to_string(),
            player_name: "Ada".to_string(),
            player_background: "sailor".to_string(),
            ..Default::default()
        };
        meta.extra
            .insert("difficulty".to_string(), serde_json::json!("hard"));
        meta
    }

    #[test]
    fn test_record_uses_names_not_ids() {
        let mut engine = engine();
        let c1 = id(&engine, "C1");
        engine.select_choice(c1);

        let record = to_record("chapter-1", engine.cursor(), engine.store(), &meta());

        assert_eq!(record.story_id, "chapter-1");
        assert_eq!(record.current_node, "S1");
        assert_eq!(record.history, vec!["R", "S1"]);
        assert_eq!(record.history_index, "1");
        assert_eq!(record.choice_ledger, vec!["C1"]);
        assert_eq!(record.choice_index, "1");
        assert!(record.is_story_node);
    }

    #[test]
    fn test_round_trip() {
        let mut engine = engine();
        let (c1, c2) = (id(&engine, "C1"), id(&engine, "C2"));
        engine.select_choice(c2);
        engine.go_back_from_game_over();
        engine.select_choice(c1);
        engine.advance();
        engine.go_back();

        let record = to_record("ch", engine.cursor(), engine.store(), &meta());
        let restored = from_record(&record, engine.store()).unwrap();

        assert_eq!(&restored, engine.cursor());
    }

    #[test]
    fn test_json_layout_and_passthrough() {
        let engine = engine();
        let record = to_record("ch", engine.cursor(), engine.store(), &meta());

        let json = record.to_json().unwrap();
        assert!(json.contains("\"storyId\""));
        assert!(json.contains("\"historyIndex\": \"0\""));
        assert!(json.contains("\"playerName\": \"Ada\""));
        assert!(json.contains("\"difficulty\": \"hard\""));

        let parsed = DurableRecord::from_json(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_legacy_record_without_version() {
        let engine = engine();
        let json = r#"{
            "storyId": "ch",
            "currentNode": "R",
            "history": ["R"],
            "historyIndex": "0",
            "isStoryNode": false,
            "playerName": "Old Save"
        }"#;

        let record = DurableRecord::from_json(json).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.choice_index, "0");
        assert_eq!(record.meta.player_name, "Old Save");

        let cursor = from_record(&record, engine.store()).unwrap();
        assert_eq!(cursor, *engine.cursor());
    }

    #[test]
    fn test_dangling_reference_reported() {
        let mut engine = engine();
        let c1 = id(&engine, "C1");
        engine.select_choice(c1);
        let record = to_record("ch", engine.cursor(), engine.store(), &meta());

        // S1 renamed in a later authoring
        let edited = AuthoredSource::new(vec![
            AuthoredRecord::node("R").with_choices(["C1", "C2"]).root(),
            AuthoredRecord::choice("C1").with_nodes(["S1b"]),
            AuthoredRecord::choice("C2").with_nodes(["S2"]),
            AuthoredRecord::node("S1b").with_nodes(["S3"]),
            AuthoredRecord::node("S2").game_over(),
            AuthoredRecord::node("S3").end_of_chapter(),
        ]);
        let store = synchronize(&edited, engine.store(), &SyncOptions::default())
            .unwrap()
            .store;

        let result = from_record(&record, &store);
        assert_eq!(
            result,
            Err(ReconstructionError::DanglingReference {
                field: "history",
                name: "S1".to_string()
            })
        );
    }

    #[test]
    fn test_save_survives_text_edit() {
        let mut engine = engine();
        let c1 = id(&engine, "C1");
        engine.select_choice(c1);
        let record = to_record("ch", engine.cursor(), engine.store(), &meta());

        let mut edited = source();
        edited.records[3] = AuthoredRecord::node("S1")
            .with_text("Rewritten")
            .with_nodes(["S3"]);
        let store = synchronize(&edited, engine.store(), &SyncOptions::default())
            .unwrap()
            .store;

        let cursor = from_record(&record, &store).unwrap();
        assert_eq!(&cursor, engine.cursor());
    }

    #[test]
    fn test_malformed_and_out_of_range_indices() {
        let engine = engine();
        let mut record = to_record("ch", engine.cursor(), engine.store(), &meta());

        record.history_index = "one".to_string();
        assert!(matches!(
            from_record(&record, engine.store()),
            Err(ReconstructionError::MalformedIndex { field: "historyIndex", .. })
        ));

        record.history_index = "5".to_string();
        assert!(matches!(
            from_record(&record, engine.store()),
            Err(ReconstructionError::IndexOutOfRange { field: "historyIndex", .. })
        ));

        record.history_index = "0".to_string();
        record.choice_index = "2".to_string();
        assert!(matches!(
            from_record(&record, engine.store()),
            Err(ReconstructionError::IndexOutOfRange { field: "choiceIndex", .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        let engine = engine();
        let base = to_record("ch", engine.cursor(), engine.store(), &meta());

        let mut empty = base.clone();
        empty.history.clear();
        assert_eq!(
            from_record(&empty, engine.store()),
            Err(ReconstructionError::EmptyHistory)
        );

        let mut mismatch = base.clone();
        mismatch.current_node = "S2".to_string();
        assert!(matches!(
            from_record(&mismatch, engine.store()),
            Err(ReconstructionError::CurrentMismatch { .. })
        ));

        let mut future = base;
        future.version = SAVE_VERSION + 1;
        assert!(matches!(
            from_record(&future, engine.store()),
            Err(ReconstructionError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_stamp_now() {
        let mut meta = SaveMeta::default();
        meta.stamp_now();
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.saved_at).is_ok());
    }

    proptest! {
        #[test]
        fn prop_round_trip_any_walk(moves in proptest::collection::vec(0u8..5, 0..30)) {
            let mut engine = engine();
            for m in moves {
                match m {
                    0 => { engine.advance(); }
                    1 => {
                        if let Some(c) = engine.choices().first().copied() {
                            engine.select_choice(c);
                        }
                    }
                    2 => {
                        if let Some(c) = engine.choices().last().copied() {
                            engine.select_choice(c);
                        }
                    }
                    3 => { engine.go_back_from_game_over(); }
                    _ => { engine.go_back(); }
                }
            }

            let record = to_record("ch", engine.cursor(), engine.store(), &SaveMeta::default());
            let json = record.to_json().unwrap();
            let parsed = DurableRecord::from_json(&json).unwrap();
            let restored = from_record(&parsed, engine.store()).unwrap();
            prop_assert_eq!(&restored, engine.cursor());
        }
    }
}
