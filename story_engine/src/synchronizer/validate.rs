//! Well-formedness checks run at the end of a synchronization pass.

use std::collections::HashMap;
use story_graph::{NodeId, NodeStore};

use super::{ChoiceCardinality, SyncError, SyncOptions};

fn key_of(store: &NodeStore, id: NodeId) -> String {
    store
        .get(id)
        .map(|n| n.external_key.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Reject graphs traversal and layout cannot handle.
///
/// Checks run in order: root with a parent, cycles, shared children, mixed
/// children. The last two are governed by `options`.
pub(super) fn check_graph(
    store: &NodeStore,
    root: NodeId,
    options: &SyncOptions,
) -> Result<(), SyncError> {
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in store.iter() {
        for child in node.children() {
            parents.entry(*child).or_default().push(node.id);
        }
    }

    if parents.contains_key(&root) {
        return Err(SyncError::RootHasParent {
            key: key_of(store, root),
        });
    }

    if let Some(id) = find_cycle(store) {
        return Err(SyncError::Cycle {
            key: key_of(store, id),
        });
    }

    if options.require_single_parent {
        for id in store.ids() {
            if let Some(list) = parents.get(id).filter(|list| list.len() > 1) {
                return Err(SyncError::MultipleParents {
                    key: key_of(store, *id),
                    parents: list.iter().map(|p| key_of(store, *p)).collect(),
                });
            }
        }
    }

    if options.reject_mixed_children {
        for id in store.ids() {
            if !store.choices_at(*id).is_empty() && !store.continuations_at(*id).is_empty() {
                return Err(SyncError::MixedChildren {
                    key: key_of(store, *id),
                });
            }
        }
    }

    Ok(())
}

/// Choices that do not lead to exactly one story continuation.
pub(super) fn choice_cardinality(store: &NodeStore) -> Vec<ChoiceCardinality> {
    store
        .iter()
        .filter(|n| n.is_choice())
        .filter_map(|n| {
            let continuations = store.continuations_at(n.id).len();
            (continuations != 1).then(|| ChoiceCardinality {
                key: n.external_key.clone(),
                continuations,
            })
        })
        .collect()
}

/// Find a node that lies on a cycle, if any.
///
/// Iterative depth-first search with three-colour marking.
fn find_cycle(store: &NodeStore) -> Option<NodeId> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: HashMap<NodeId, Mark> = HashMap::with_capacity(store.len());

    for &start in store.ids() {
        if marks.contains_key(&start) {
            continue;
        }

        marks.insert(start, Mark::Visiting);
        let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];

        while let Some(&(id, next)) = stack.last() {
            let children = store.get(id).map(|n| n.children()).unwrap_or(&[]);

            if next < children.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let child = children[next];
                match marks.get(&child) {
                    Some(Mark::Visiting) => return Some(child),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Visiting);
                        stack.push((child, 0));
                    }
                }
            } else {
                marks.insert(id, Mark::Done);
                stack.pop();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_graph::StoryNode;

    fn link(store: &mut NodeStore, parent: NodeId, child: NodeId) {
        if let Some(node) = store.get_mut(parent) {
            node.add_child(child);
        }
    }

    #[test]
    fn test_find_cycle_detects_loop() {
        let mut store = NodeStore::new();
        let a = store.insert(StoryNode::story("a"));
        let b = store.insert(StoryNode::story("b"));
        let c = store.insert(StoryNode::story("c"));
        link(&mut store, a, b);
        link(&mut store, b, c);
        link(&mut store, c, b);

        assert!(find_cycle(&store).is_some());
    }

    #[test]
    fn test_find_cycle_accepts_diamond() {
        let mut store = NodeStore::new();
        let a = store.insert(StoryNode::story("a"));
        let b = store.insert(StoryNode::story("b"));
        let c = store.insert(StoryNode::story("c"));
        let d = store.insert(StoryNode::story("d"));
        link(&mut store, a, b);
        link(&mut store, a, c);
        link(&mut store, b, d);
        link(&mut store, c, d);

        assert!(find_cycle(&store).is_none());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let mut store = NodeStore::new();
        let a = store.insert(StoryNode::story("a"));
        link(&mut store, a, a);

        assert_eq!(find_cycle(&store), Some(a));
    }

    #[test]
    fn test_choice_cardinality() {
        let mut store = NodeStore::new();
        store.insert(StoryNode::choice("dead_end"));
        let good = store.insert(StoryNode::choice("good"));
        let next = store.insert(StoryNode::story("next"));
        link(&mut store, good, next);

        let found = choice_cardinality(&store);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "dead_end");
        assert_eq!(found[0].continuations, 0);
    }
}
