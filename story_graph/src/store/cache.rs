//! Flat cache records for persisting a store between synchronizations.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{NodeStore, StoreError};
use crate::node::{NodeFlags, NodeId, NodeKind, StoryNode};

/// One node as written to the graph cache.
///
/// Layout rectangles are not cached; they are recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedNode {
    pub id: NodeId,
    pub external_key: String,
    pub label: String,
    #[serde(default)]
    pub text: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub is_game_over: bool,
    #[serde(default)]
    pub is_end_of_chapter: bool,
    #[serde(default)]
    pub is_end_of_part: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_title: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl From<&StoryNode> for CachedNode {
    fn from(node: &StoryNode) -> Self {
        Self {
            id: node.id,
            external_key: node.external_key.clone(),
            label: node.label.clone(),
            text: node.text.clone(),
            kind: node.kind(),
            is_root: node.flags.is_root,
            is_game_over: node.flags.is_game_over,
            is_end_of_chapter: node.flags.is_end_of_chapter,
            is_end_of_part: node.flags.is_end_of_part,
            image: node.image.clone(),
            image_title: node.image_title.clone(),
            item: node.item.clone(),
            background: node.background.clone(),
            children: node.children().to_vec(),
        }
    }
}

impl CachedNode {
    fn into_node(self) -> StoryNode {
        let mut node = StoryNode::with_id(self.id, self.external_key, self.kind)
            .with_label(self.label)
            .with_text(self.text)
            .with_flags(NodeFlags {
                is_root: self.is_root,
                is_game_over: self.is_game_over,
                is_end_of_chapter: self.is_end_of_chapter,
                is_end_of_part: self.is_end_of_part,
            });
        node.image = self.image;
        node.image_title = self.image_title;
        node.item = self.item;
        node.background = self.background;
        for child in self.children {
            node.add_child(child);
        }
        node
    }
}

impl NodeStore {
    /// Flatten the store into cache records, in authored order.
    pub fn to_cache(&self) -> Vec<CachedNode> {
        self.iter().map(CachedNode::from).collect()
    }

    /// Rebuild a store from cache records.
    ///
    /// Rejects duplicate IDs and child links to IDs that are not in the cache.
    pub fn from_cache(records: Vec<CachedNode>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(StoreError::DuplicateId(record.id));
            }
        }

        for record in &records {
            if let Some(child) = record.children.iter().find(|c| !seen.contains(*c)) {
                return Err(StoreError::DanglingChild {
                    parent: record.external_key.clone(),
                    child: *child,
                });
            }
        }

        let mut store = NodeStore::new();
        for record in records {
            store.insert(record.into_node());
        }
        Ok(store)
    }

    /// Serialize the cache records as pretty JSON.
    pub fn to_cache_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&self.to_cache())?)
    }

    /// Parse a JSON cache. Blank input yields an empty store.
    pub fn from_cache_json(json: &str) -> Result<Self, StoreError> {
        Self::from_cache_slice(json.as_bytes())
    }

    /// Parse a JSON cache from raw bytes. Invalid UTF-8 is an error.
    pub fn from_cache_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(NodeStore::new());
        }
        let records: Vec<CachedNode> = serde_json::from_slice(bytes)?;
        Self::from_cache(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> NodeStore {
        let mut store = NodeStore::new();
        let end = StoryNode::story("end").with_flags(NodeFlags {
            is_end_of_chapter: true,
            ..Default::default()
        });
        let mut choice = StoryNode::choice("go").with_text("Go north");
        choice.add_child(end.id);
        let mut root = StoryNode::story("start")
            .as_root()
            .with_label("Start")
            .with_text("You wake up.")
            .with_image("room.png");
        root.background = Some("night".to_string());
        root.add_child(choice.id);

        store.insert(root);
        store.insert(choice);
        store.insert(end);
        store
    }

    #[test]
    fn test_cache_round_trip() {
        let store = sample_store();

        let json = store.to_cache_json().unwrap();
        let restored = NodeStore::from_cache_json(&json).unwrap();

        assert_eq!(restored, store);
    }

    #[test]
    fn test_cache_drops_layout() {
        let mut store = sample_store();
        let root = store.root().unwrap();
        store.get_mut(root).unwrap().layout_rect = Some(crate::Rect::new(0.0, 0.0, 1.0, 1.0));

        let restored = NodeStore::from_cache(store.to_cache()).unwrap();
        assert!(restored.get(root).unwrap().layout_rect.is_none());
    }

    #[test]
    fn test_cache_uses_camel_case() {
        let json = sample_store().to_cache_json().unwrap();
        assert!(json.contains("\"externalKey\""));
        assert!(json.contains("\"isEndOfChapter\""));
    }

    #[test]
    fn test_blank_cache_is_empty_store() {
        let store = NodeStore::from_cache_json("  \n").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let json = sample_store().to_cache_json().unwrap();
        let mut bytes = json.into_bytes();
        let at = bytes
            .windows(7)
            .position(|w| w == b"\"start\"")
            .unwrap();
        bytes[at + 1] = 0xFF;

        let result = NodeStore::from_cache_slice(&bytes);
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut records = sample_store().to_cache();
        records.push(records[0].clone());

        let result = NodeStore::from_cache(records);
        assert!(matches!(result, Err(StoreError::DuplicateId(_))));
    }

    #[test]
    fn test_dangling_child_rejected() {
        let mut records = sample_store().to_cache();
        records.retain(|r| r.external_key != "end");

        let result = NodeStore::from_cache(records);
        assert!(matches!(
            result,
            Err(StoreError::DanglingChild { ref parent, .. }) if parent == "go"
        ));
    }
}
