//! Node definitions for the story graph.

mod story_node;

pub use story_node::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for story nodes.
///
/// Minted once, the first time a node is synchronized, and carried across
/// every later synchronization that matches the same external key. It has no
/// relation to the node's position in the authored source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Mint a fresh random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The all-zero ID. Never assigned to a real node.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kinds of story nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeKind {
    /// Narrative text shown to the player.
    #[default]
    Story,
    /// A selectable option presented at a story node.
    Choice,
}

impl NodeKind {
    pub fn is_choice(&self) -> bool {
        matches!(self, NodeKind::Choice)
    }
}

/// Independent boolean markers carried by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeFlags {
    pub is_root: bool,
    pub is_game_over: bool,
    pub is_end_of_chapter: bool,
    pub is_end_of_part: bool,
}

impl NodeFlags {
    /// Check whether any terminal outcome flag is set.
    pub fn is_terminal_outcome(&self) -> bool {
        self.is_game_over || self.is_end_of_chapter || self.is_end_of_part
    }
}

/// Axis-aligned rectangle in editor space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Shrink the rectangle by `margin` on every side.
    ///
    /// Width and height never go below zero.
    pub fn inset(&self, margin: f32) -> Self {
        Self {
            x: self.x + margin,
            y: self.y + margin,
            width: (self.width - 2.0 * margin).max(0.0),
            height: (self.height - 2.0 * margin).max(0.0),
        }
    }
}
