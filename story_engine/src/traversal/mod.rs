//! Traversal Engine - the playback state machine.
//!
//! The state at any node follows from its kind and children:
//! - **Continue**: only story children, the player advances automatically
//! - **Choose**: choice children are presented (they win over story children)
//! - **Terminal**: no children, the node's flags decide the outcome
//!
//! Misuse never fails loudly. Every operation either moves the cursor or
//! returns [`Step::Ignored`] and leaves the cursor exactly as it was.

mod cursor;

pub use cursor::*;

use story_graph::{NodeId, NodeStore, StoryNode};
use thiserror::Error;

/// Reasons a traversal step was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("already at the start of the history")]
    AtStart,

    #[error("node is not in the story graph")]
    UnknownNode,

    #[error("node is not a story child of the current node")]
    NotAContinuation,

    #[error("the current node requires a choice")]
    ChoiceRequired,

    #[error("the current node offers no choices")]
    NoChoices,

    #[error("node is not a choice")]
    NotAChoice,

    #[error("choice is not offered at the current node")]
    NotOffered,

    #[error("choice was abandoned after a game over")]
    ChoiceAbandoned,

    #[error("no story continuation follows")]
    NoContinuation,

    #[error("the current node is not a game over")]
    NotGameOver,
}

/// Result of a traversal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The cursor moved to this node.
    Moved(NodeId),
    /// Nothing changed.
    Ignored(Refusal),
}

impl Step {
    pub fn is_moved(&self) -> bool {
        matches!(self, Step::Moved(_))
    }

    pub fn refusal(&self) -> Option<Refusal> {
        match self {
            Step::Moved(_) => None,
            Step::Ignored(refusal) => Some(*refusal),
        }
    }
}

/// Outcome signalled by a terminal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    GameOver,
    EndOfPart,
    EndOfChapter,
    /// A dead end with no outcome flag.
    Unmarked,
}

/// What the player can do at the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// Automatic continuation to the first story child.
    Continue(NodeId),
    /// Choices to present, in authored order.
    Choose(Vec<NodeId>),
    Terminal(Outcome),
}

/// Errors starting or resuming a playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("story graph has no root node")]
    NoRoot,

    #[error("cursor refers to node {0} which is not in the story graph")]
    UnknownNode(NodeId),

    #[error("cursor history does not agree with its current node")]
    InconsistentCursor,
}

/// Owns the story graph and the cursor for one playthrough.
#[derive(Debug, Clone)]
pub struct TraversalEngine {
    store: NodeStore,
    cursor: TraversalCursor,
}

impl TraversalEngine {
    /// Start a fresh playthrough at the root.
    pub fn start(store: NodeStore) -> Result<Self, TraversalError> {
        let root = store.root().ok_or(TraversalError::NoRoot)?;
        let mut engine = Self {
            store,
            cursor: TraversalCursor::new(root),
        };
        engine.refresh_display_mode();
        tracing::debug!(root = %root, "traversal started");
        Ok(engine)
    }

    /// Resume a playthrough from an existing cursor.
    pub fn resume(store: NodeStore, cursor: TraversalCursor) -> Result<Self, TraversalError> {
        check_cursor(&store, &cursor)?;
        let mut engine = Self { store, cursor };
        engine.refresh_display_mode();
        Ok(engine)
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn cursor(&self) -> &TraversalCursor {
        &self.cursor
    }

    /// Swap in another cursor for the same graph.
    ///
    /// The current cursor is kept if the new one does not fit the graph.
    pub fn replace_cursor(&mut self, cursor: TraversalCursor) -> Result<(), TraversalError> {
        check_cursor(&self.store, &cursor)?;
        self.cursor = cursor;
        self.refresh_display_mode();
        Ok(())
    }

    /// Give back the graph and cursor.
    pub fn into_parts(self) -> (NodeStore, TraversalCursor) {
        (self.store, self.cursor)
    }

    pub fn current(&self) -> Option<&StoryNode> {
        self.store.get(self.cursor.current_node)
    }

    /// Choice children of `node`.
    pub fn choices_at(&self, node: NodeId) -> Vec<NodeId> {
        self.store.choices_at(node)
    }

    /// Story children of `node`.
    pub fn continuations_at(&self, node: NodeId) -> Vec<NodeId> {
        self.store.continuations_at(node)
    }

    /// Choices offered at the current node, minus an abandoned one.
    pub fn choices(&self) -> Vec<NodeId> {
        let mut choices = self.choices_at(self.cursor.current_node);
        if let Some(abandoned) = self.cursor.abandoned_choice {
            choices.retain(|c| *c != abandoned);
        }
        choices
    }

    pub fn has_more(&self) -> bool {
        self.current().is_some_and(|n| n.has_children())
    }

    pub fn is_game_over(&self) -> bool {
        self.current().is_some_and(|n| n.flags.is_game_over)
    }

    pub fn is_end_of_chapter(&self) -> bool {
        self.current().is_some_and(|n| n.flags.is_end_of_chapter)
    }

    pub fn is_end_of_part(&self) -> bool {
        self.current().is_some_and(|n| n.flags.is_end_of_part)
    }

    /// Classify the current node.
    pub fn state(&self) -> NodeState {
        let current = self.cursor.current_node;

        let choices = self.choices();
        if !self.choices_at(current).is_empty() {
            return NodeState::Choose(choices);
        }

        if let Some(next) = self.continuations_at(current).first() {
            return NodeState::Continue(*next);
        }

        let outcome = match self.current().map(|n| n.flags) {
            Some(flags) if flags.is_game_over => Outcome::GameOver,
            Some(flags) if flags.is_end_of_part => Outcome::EndOfPart,
            Some(flags) if flags.is_end_of_chapter => Outcome::EndOfChapter,
            _ => Outcome::Unmarked,
        };
        NodeState::Terminal(outcome)
    }

    /// Move to `next`, which must be a story child of the current node.
    pub fn advance_to(&mut self, next: NodeId) -> Step {
        let current = self.cursor.current_node;

        let Some(node) = self.store.get(next) else {
            return self.refuse("advance_to", Refusal::UnknownNode);
        };
        if node.is_choice() || !self.store.get(current).is_some_and(|n| n.has_child(next)) {
            return self.refuse("advance_to", Refusal::NotAContinuation);
        }
        if !self.choices_at(current).is_empty() {
            return self.refuse("advance_to", Refusal::ChoiceRequired);
        }

        self.move_to(next)
    }

    /// Follow the automatic continuation from the current node.
    pub fn advance(&mut self) -> Step {
        match self.state() {
            NodeState::Continue(next) => self.move_to(next),
            NodeState::Choose(_) => self.refuse("advance", Refusal::ChoiceRequired),
            NodeState::Terminal(_) => self.refuse("advance", Refusal::NoContinuation),
        }
    }

    /// Select a choice offered at the current node and move to its
    /// continuation.
    ///
    /// The ledger records a choice once; selecting it again after going back
    /// only moves the choice index.
    pub fn select_choice(&mut self, choice: NodeId) -> Step {
        let current = self.cursor.current_node;

        let Some(node) = self.store.get(choice) else {
            return self.refuse("select_choice", Refusal::UnknownNode);
        };
        let offered = self.choices_at(current);
        if offered.is_empty() {
            return self.refuse("select_choice", Refusal::NoChoices);
        }
        if !node.is_choice() {
            return self.refuse("select_choice", Refusal::NotAChoice);
        }
        if !offered.contains(&choice) {
            return self.refuse("select_choice", Refusal::NotOffered);
        }
        if self.cursor.abandoned_choice == Some(choice) {
            return self.refuse("select_choice", Refusal::ChoiceAbandoned);
        }
        let Some(next) = self.continuations_at(choice).first().copied() else {
            return self.refuse("select_choice", Refusal::NoContinuation);
        };

        let ledger = &mut self.cursor.choice_ledger;
        self.cursor.choice_index = match ledger.iter().position(|c| *c == choice) {
            Some(position) => position + 1,
            None => {
                ledger.push(choice);
                ledger.len()
            }
        };

        self.move_to(next)
    }

    /// Step back one entry in the history.
    pub fn go_back(&mut self) -> Step {
        if self.cursor.at_start() {
            return self.refuse("go_back", Refusal::AtStart);
        }

        self.cursor.history_index -= 1;
        self.cursor.current_node = self.cursor.history[self.cursor.history_index];
        self.cursor.abandoned_choice = None;
        self.refresh_display_mode();
        Step::Moved(self.cursor.current_node)
    }

    /// Step back from a game over and hide the choice that led to it.
    ///
    /// The ledger entry for that choice stays in place.
    pub fn go_back_from_game_over(&mut self) -> Step {
        if !self.is_game_over() {
            return self.refuse("go_back_from_game_over", Refusal::NotGameOver);
        }
        if self.cursor.at_start() {
            return self.refuse("go_back_from_game_over", Refusal::AtStart);
        }

        let lost = self.cursor.current_node;
        let previous = self.cursor.history[self.cursor.history_index - 1];
        let abandoned = self
            .choices_at(previous)
            .into_iter()
            .find(|c| self.store.get(*c).is_some_and(|n| n.has_child(lost)));

        let step = self.go_back();
        self.cursor.abandoned_choice = abandoned;
        tracing::debug!(abandoned = ?abandoned, "backed out of game over");
        step
    }

    fn move_to(&mut self, next: NodeId) -> Step {
        let cursor = &mut self.cursor;
        cursor.history.truncate(cursor.history_index + 1);
        cursor.history.push(next);
        cursor.history_index += 1;
        cursor.current_node = next;
        cursor.abandoned_choice = None;
        self.refresh_display_mode();
        Step::Moved(next)
    }

    fn refresh_display_mode(&mut self) {
        self.cursor.is_story_node = self.choices_at(self.cursor.current_node).is_empty();
    }

    fn refuse(&self, operation: &'static str, refusal: Refusal) -> Step {
        tracing::debug!(
            operation,
            node = %self.cursor.current_node,
            %refusal,
            "traversal step ignored"
        );
        Step::Ignored(refusal)
    }
}

/// Check that a cursor is well-formed and only names nodes in `store`.
pub(crate) fn check_cursor(store: &NodeStore, cursor: &TraversalCursor) -> Result<(), TraversalError> {
    if let Some(missing) = cursor.referenced_ids().find(|id| !store.contains(*id)) {
        return Err(TraversalError::UnknownNode(missing));
    }
    if !cursor.is_consistent() {
        return Err(TraversalError::InconsistentCursor);
    }
    Ok(())
}
