//! Story node - a single story beat or choice in the graph.

use serde::{Deserialize, Serialize};

use super::{NodeFlags, NodeId, NodeKind, Rect};

/// A node in the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: NodeId,

    /// Key declared by the authoring markup. Used to match nodes across
    /// synchronizations and as the node's persisted name.
    pub external_key: String,

    /// Short display title.
    pub label: String,

    /// Body text shown to the player.
    pub text: String,

    /// Fixed at creation.
    kind: NodeKind,

    pub flags: NodeFlags,

    pub image: Option<String>,
    pub image_title: Option<String>,
    pub item: Option<String>,
    pub background: Option<String>,

    /// Ordered child IDs, no duplicates.
    children: Vec<NodeId>,

    /// Placement in editor space. Assigned by layout only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_rect: Option<Rect>,

    /// Text area inside `layout_rect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_rect: Option<Rect>,
}

impl StoryNode {
    /// Create a new node with a fresh ID.
    ///
    /// The label defaults to the external key.
    pub fn new(external_key: impl Into<String>, kind: NodeKind) -> Self {
        Self::with_id(NodeId::new(), external_key, kind)
    }

    /// Create a node with a known ID.
    pub fn with_id(id: NodeId, external_key: impl Into<String>, kind: NodeKind) -> Self {
        let external_key = external_key.into();
        Self {
            id,
            label: external_key.clone(),
            external_key,
            text: String::new(),
            kind,
            flags: NodeFlags::default(),
            image: None,
            image_title: None,
            item: None,
            background: None,
            children: Vec::new(),
            layout_rect: None,
            text_rect: None,
        }
    }

    /// Create a story node.
    pub fn story(external_key: impl Into<String>) -> Self {
        Self::new(external_key, NodeKind::Story)
    }

    /// Create a choice node.
    pub fn choice(external_key: impl Into<String>) -> Self {
        Self::new(external_key, NodeKind::Choice)
    }

    /// Set the body text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Mark this node as the graph root.
    pub fn as_root(mut self) -> Self {
        self.flags.is_root = true;
        self
    }

    /// Set the image. Empty strings mean no image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = non_empty(image.into());
        self
    }

    /// Add a child, keeping authored order.
    pub fn with_child(mut self, child: NodeId) -> Self {
        self.add_child(child);
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_choice(&self) -> bool {
        self.kind.is_choice()
    }

    pub fn is_root(&self) -> bool {
        self.flags.is_root
    }

    /// Child IDs in authored order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn has_child(&self, id: NodeId) -> bool {
        self.children.contains(&id)
    }

    /// Append a child link.
    ///
    /// Returns `false` (and leaves the list untouched) if the child is already
    /// linked.
    pub fn add_child(&mut self, child: NodeId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Remove a child link if present.
    pub fn remove_child(&mut self, child: NodeId) -> bool {
        let before = self.children.len();
        self.children.retain(|c| *c != child);
        self.children.len() != before
    }

    /// Drop every child link.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Copy the authored content of `other` onto this node.
    ///
    /// Identity, kind, children, and layout are left alone.
    pub fn copy_content_from(&mut self, other: &StoryNode) {
        self.label = other.label.clone();
        self.text = other.text.clone();
        self.flags = other.flags;
        self.image = other.image.clone();
        self.image_title = other.image_title.clone();
        self.item = other.item.clone();
        self.background = other.background.clone();
    }
}

/// Treat empty metadata strings as absent.
pub fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
