//! Node store - the canonical set of story nodes.
//!
//! The store keeps nodes by stable ID and remembers authored order so that
//! iteration, caching, and layout are deterministic.

mod cache;

pub use cache::*;

use std::collections::HashMap;
use thiserror::Error;

use crate::node::{NodeId, NodeKind, StoryNode};

/// Errors raised when rebuilding a store from its cached form.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id {0} in cache")]
    DuplicateId(NodeId),

    #[error("node '{parent}' links to missing child {child}")]
    DanglingChild { parent: String, child: NodeId },
}

/// Owns every node of one story graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStore {
    /// All nodes stored by ID.
    nodes: HashMap<NodeId, StoryNode>,

    /// Insertion (authored) order.
    order: Vec<NodeId>,
}

impl NodeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node with the same ID in place.
    pub fn insert(&mut self, node: StoryNode) -> NodeId {
        let id = node.id;
        if self.nodes.insert(id, node).is_none() {
            self.order.push(id);
        }
        id
    }

    /// Remove a node and strip every child link that pointed at it.
    pub fn remove(&mut self, id: NodeId) -> Option<StoryNode> {
        let removed = self.nodes.remove(&id)?;
        self.order.retain(|other| *other != id);

        for node in self.nodes.values_mut() {
            node.remove_child(id);
        }

        Some(removed)
    }

    pub fn get(&self, id: NodeId) -> Option<&StoryNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut StoryNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes in authored order.
    pub fn iter(&self) -> impl Iterator<Item = &StoryNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Node IDs in authored order.
    pub fn ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Put the listed IDs first, in the given order, followed by any others.
    ///
    /// Unknown IDs in `order` are ignored.
    pub fn reorder(&mut self, order: &[NodeId]) {
        let mut reordered: Vec<NodeId> = Vec::with_capacity(self.order.len());
        for id in order {
            if self.nodes.contains_key(id) && !reordered.contains(id) {
                reordered.push(*id);
            }
        }
        for id in &self.order {
            if !reordered.contains(id) {
                reordered.push(*id);
            }
        }
        self.order = reordered;
    }

    /// The first node flagged as root, in authored order.
    pub fn root(&self) -> Option<NodeId> {
        self.iter().find(|n| n.is_root()).map(|n| n.id)
    }

    /// Find a node by its external key (linear scan).
    pub fn find_by_key(&self, key: &str) -> Option<&StoryNode> {
        self.iter().find(|n| n.external_key == key)
    }

    /// Build the `external_key -> id` index.
    ///
    /// The index is not kept on the store; callers build it when they need
    /// to match keys and drop it afterwards. On duplicate keys the first node
    /// in authored order wins.
    pub fn key_index(&self) -> HashMap<String, NodeId> {
        let mut index = HashMap::with_capacity(self.len());
        for node in self.iter() {
            index.entry(node.external_key.clone()).or_insert(node.id);
        }
        index
    }

    /// All nodes that list `id` as a child, in authored order.
    pub fn parents_of(&self, id: NodeId) -> Vec<NodeId> {
        self.iter()
            .filter(|n| n.has_child(id))
            .map(|n| n.id)
            .collect()
    }

    /// Children of `id` that are choice nodes.
    pub fn choices_at(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_kind(id, NodeKind::Choice)
    }

    /// Children of `id` that are story nodes.
    pub fn continuations_at(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_kind(id, NodeKind::Story)
    }

    fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.get(id)
            .map(|node| {
                node.children()
                    .iter()
                    .filter(|child| self.get(**child).is_some_and(|c| c.kind() == kind))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}
