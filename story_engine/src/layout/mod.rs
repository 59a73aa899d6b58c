//! Layout Engine - places story nodes on a 2D canvas for editing tools.
//!
//! Breadth-first from the root: the root sits at the configured origin, and
//! child `i` of a placed node lands one horizontal step to the right and `i`
//! vertical steps down from its parent. A node reached through several
//! parents keeps the position of its first visit. Nodes the root cannot
//! reach are laid out afterwards as extra trees stacked below.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use story_graph::{NodeId, NodeStore, Rect};

/// Geometry used by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f32,
    pub origin_y: f32,

    /// Size of every node rectangle.
    pub node_width: f32,
    pub node_height: f32,

    /// Offset from a parent to its children.
    pub horizontal_step: f32,

    /// Offset between consecutive siblings.
    pub vertical_step: f32,

    /// Inset of the text area inside a node rectangle.
    pub text_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            node_width: 200.0,
            node_height: 100.0,
            horizontal_step: 300.0,
            vertical_step: 150.0,
            text_margin: 10.0,
        }
    }
}

/// Counts from one layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    /// Nodes reached from the root.
    pub reachable: usize,
    /// Nodes placed as extra trees because the root cannot reach them.
    pub detached: usize,
}

/// Assigns `layout_rect` and `text_rect` to every node.
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    /// Create a layout engine with the given configuration.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Create a layout engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LayoutConfig::default())
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lay out `store` in place. Children lists are never touched.
    pub fn layout(&self, store: &mut NodeStore) -> LayoutStats {
        let mut placed: HashMap<NodeId, Rect> = HashMap::with_capacity(store.len());
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut stats = LayoutStats::default();

        if let Some(root) = store.root() {
            placed.insert(root, self.origin_rect(self.config.origin_y));
            queue.push_back(root);
            stats.reachable = self.spread(store, &mut placed, &mut queue);
        }

        let ids: Vec<NodeId> = store.ids().to_vec();
        for id in ids {
            if placed.contains_key(&id) {
                continue;
            }
            let lowest = placed
                .values()
                .map(|r| r.y)
                .fold(f32::NEG_INFINITY, f32::max);
            let y = if lowest.is_finite() {
                lowest + self.config.vertical_step
            } else {
                self.config.origin_y
            };
            placed.insert(id, self.origin_rect(y));
            queue.push_back(id);
            stats.detached += self.spread(store, &mut placed, &mut queue);
        }

        for (id, rect) in placed {
            if let Some(node) = store.get_mut(id) {
                node.layout_rect = Some(rect);
                node.text_rect = Some(rect.inset(self.config.text_margin));
            }
        }

        if stats.detached > 0 {
            tracing::debug!(
                detached = stats.detached,
                "laid out nodes unreachable from the root"
            );
        }
        stats
    }

    /// Lay out an owned store and hand it back.
    pub fn laid_out(&self, mut store: NodeStore) -> NodeStore {
        self.layout(&mut store);
        store
    }

    fn origin_rect(&self, y: f32) -> Rect {
        Rect::new(
            self.config.origin_x,
            y,
            self.config.node_width,
            self.config.node_height,
        )
    }

    /// Drain the queue, placing unvisited children. Returns how many nodes
    /// were dequeued.
    fn spread(
        &self,
        store: &NodeStore,
        placed: &mut HashMap<NodeId, Rect>,
        queue: &mut VecDeque<NodeId>,
    ) -> usize {
        let mut visited = 0;

        while let Some(id) = queue.pop_front() {
            visited += 1;
            let Some(parent) = placed.get(&id).copied() else {
                continue;
            };
            let Some(node) = store.get(id) else {
                continue;
            };

            for (index, child) in node.children().iter().enumerate() {
                if placed.contains_key(child) {
                    continue;
                }
                let rect = Rect::new(
                    parent.x + self.config.horizontal_step,
                    parent.y + index as f32 * self.config.vertical_step,
                    parent.width,
                    parent.height,
                );
                placed.insert(*child, rect);
                queue.push_back(*child);
            }
        }

        visited
    }
}
