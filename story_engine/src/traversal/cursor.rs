//! Traversal cursor - the complete playback state of one playthrough.

use serde::{Deserialize, Serialize};
use story_graph::NodeId;

/// Where the player is, where they have been, and what they chose.
///
/// Back-navigation moves `history_index` instead of popping `history`, so
/// the entries after the index are kept until the player moves forward
/// along a different path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalCursor {
    pub(crate) current_node: NodeId,
    pub(crate) history: Vec<NodeId>,
    pub(crate) history_index: usize,
    pub(crate) choice_ledger: Vec<NodeId>,
    pub(crate) choice_index: usize,
    pub(crate) is_story_node: bool,
    pub(crate) abandoned_choice: Option<NodeId>,
}

impl TraversalCursor {
    /// Fresh cursor at the start of a chapter.
    pub fn new(root: NodeId) -> Self {
        Self {
            current_node: root,
            history: vec![root],
            history_index: 0,
            choice_ledger: Vec::new(),
            choice_index: 0,
            is_story_node: true,
            abandoned_choice: None,
        }
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    /// Every story node recorded, including entries past `history_index`.
    pub fn history(&self) -> &[NodeId] {
        &self.history
    }

    pub fn history_index(&self) -> usize {
        self.history_index
    }

    /// Choices selected so far, in first-selection order.
    pub fn choice_ledger(&self) -> &[NodeId] {
        &self.choice_ledger
    }

    /// One past the ledger position of the most recent selection.
    pub fn choice_index(&self) -> usize {
        self.choice_index
    }

    /// Whether the next step is an automatic continuation rather than a
    /// choice prompt.
    pub fn is_story_node(&self) -> bool {
        self.is_story_node
    }

    /// Choice hidden after backing out of a game over.
    pub fn abandoned_choice(&self) -> Option<NodeId> {
        self.abandoned_choice
    }

    /// The path from the start up to the current node.
    pub fn visited(&self) -> &[NodeId] {
        let end = (self.history_index + 1).min(self.history.len());
        &self.history[..end]
    }

    pub fn at_start(&self) -> bool {
        self.history_index == 0
    }

    /// Check the structural invariants of the cursor.
    pub fn is_consistent(&self) -> bool {
        self.history.get(self.history_index) == Some(&self.current_node)
            && self.choice_index <= self.choice_ledger.len()
    }

    /// Every node ID the cursor refers to.
    pub(crate) fn referenced_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.current_node)
            .chain(self.history.iter().copied())
            .chain(self.choice_ledger.iter().copied())
            .chain(self.abandoned_choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_cursor() {
        let root = NodeId::new();
        let cursor = TraversalCursor::new(root);

        assert_eq!(cursor.current_node(), root);
        assert_eq!(cursor.history(), &[root]);
        assert_eq!(cursor.visited(), &[root]);
        assert!(cursor.at_start());
        assert!(cursor.choice_ledger().is_empty());
        assert!(cursor.is_consistent());
    }

    #[test]
    fn test_inconsistent_cursor_detected() {
        let mut cursor = TraversalCursor::new(NodeId::new());
        cursor.current_node = NodeId::new();
        assert!(!cursor.is_consistent());

        let mut cursor = TraversalCursor::new(NodeId::new());
        cursor.choice_index = 1;
        assert!(!cursor.is_consistent());
    }

    #[test]
    fn test_visited_stops_at_index() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let mut cursor = TraversalCursor::new(a);
        cursor.history = vec![a, b, c];
        cursor.history_index = 1;
        cursor.current_node = b;

        assert_eq!(cursor.visited(), &[a, b]);
        assert_eq!(cursor.history().len(), 3);
    }

    #[test]
    fn test_referenced_ids() {
        let (a, c) = (NodeId::new(), NodeId::new());
        let mut cursor = TraversalCursor::new(a);
        cursor.abandoned_choice = Some(c);

        let ids: Vec<_> = cursor.referenced_ids().collect();
        assert_eq!(ids, vec![a, a, c]);
    }
}
