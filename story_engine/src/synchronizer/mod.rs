//! Graph Synchronizer - merges freshly authored content into a cached graph.
//!
//! The merge works as follows:
//! 1. **Match**: Each authored record is looked up by external key in the prior store
//! 2. **Retain**: Matches keep their stable ID and take the authored content
//! 3. **Mint**: Unmatched records get a new ID
//! 4. **Prune**: Prior nodes nobody matched are removed, along with links to them
//! 5. **Link**: Children are rebuilt from the authored child keys
//! 6. **Root**: The root flag is re-derived from the authored attributes
//! 7. **Validate**: The resulting graph must be acyclic with a parentless root
//!
//! Keeping IDs stable across edits is what lets saved playthroughs survive a
//! content change.

mod report;
mod validate;

pub use report::*;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use story_graph::{AuthoredSource, NodeId, NodeStore, StoreError};
use thiserror::Error;

/// Options controlling which malformed graphs are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Reject non-root nodes reachable from more than one parent.
    pub require_single_parent: bool,

    /// Reject nodes that have both choice and story children.
    pub reject_mixed_children: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            require_single_parent: true,
            reject_mixed_children: true,
        }
    }
}

/// Fatal synchronization failures.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("external key '{key}' is declared more than once")]
    DuplicateKey { key: String },

    #[error("no node is marked as root")]
    NoRoot,

    #[error("root node '{key}' is the child of another node")]
    RootHasParent { key: String },

    #[error("node '{key}' is part of a cycle")]
    Cycle { key: String },

    #[error("node '{key}' has several parents: {}", parents.join(", "))]
    MultipleParents { key: String, parents: Vec<String> },

    #[error("node '{key}' has both choice and story children")]
    MixedChildren { key: String },

    #[error("graph cache error: {0}")]
    Cache(#[from] StoreError),
}

/// Output of a successful synchronization.
#[derive(Debug, Clone)]
pub struct Synchronized {
    pub store: NodeStore,
    pub report: SyncReport,
}

/// Merge `source` into `prior`, preserving the IDs of matched nodes.
///
/// `prior` is not modified; the merged graph is returned as a new store.
pub fn synchronize(
    source: &AuthoredSource,
    prior: &NodeStore,
    options: &SyncOptions,
) -> Result<Synchronized, SyncError> {
    check_unique_keys(source)?;

    let prior_index = prior.key_index();
    let mut store = prior.clone();
    let mut report = SyncReport::default();
    let mut retained: HashSet<NodeId> = HashSet::with_capacity(source.len());
    let mut index: HashMap<&str, NodeId> = HashMap::with_capacity(source.len());
    let mut authored_order: Vec<NodeId> = Vec::with_capacity(source.len());

    // Match, retain, mint
    for record in source.iter() {
        let existing = prior_index
            .get(&record.id)
            .and_then(|id| prior.get(*id))
            .map(|node| (node.id, node.kind()));

        let id = match existing {
            Some((id, kind)) if kind == record.kind() => {
                let fresh = record.to_node(id);
                if let Some(node) = store.get_mut(id) {
                    node.copy_content_from(&fresh);
                }
                report.retained.push(id);
                id
            }
            Some((previous, kind)) => {
                let current = store.insert(record.to_node(NodeId::new()));
                tracing::warn!(
                    key = %record.id,
                    from = ?kind,
                    to = ?record.kind(),
                    "node kind changed, minting a new identity"
                );
                report.kind_changed.push(KindChange {
                    key: record.id.clone(),
                    previous,
                    current,
                });
                report.created.push(current);
                current
            }
            None => {
                let id = store.insert(record.to_node(NodeId::new()));
                report.created.push(id);
                id
            }
        };

        retained.insert(id);
        index.insert(record.id.as_str(), id);
        authored_order.push(id);
    }

    // Prune
    let orphans: Vec<NodeId> = store
        .ids()
        .iter()
        .filter(|id| !retained.contains(id))
        .copied()
        .collect();
    for id in orphans {
        if store.remove(id).is_some() {
            report.removed.push(id);
        }
    }
    store.reorder(&authored_order);

    // Link
    for record in source.iter() {
        let Some(parent) = index.get(record.id.as_str()).copied() else {
            continue;
        };
        let children: Vec<NodeId> = record
            .child_keys()
            .filter_map(|key| match index.get(key) {
                Some(child) => Some(*child),
                None => {
                    tracing::warn!(parent = %record.id, child = key, "dropping link to unknown node");
                    report.dropped_links.push(DroppedLink {
                        parent: record.id.clone(),
                        child: key.to_string(),
                    });
                    None
                }
            })
            .collect();

        if let Some(node) = store.get_mut(parent) {
            node.clear_children();
            for child in children {
                node.add_child(child);
            }
        }
    }

    // Root
    let mut roots = source
        .iter()
        .filter(|r| r.is_root_node)
        .filter_map(|r| index.get(r.id.as_str()).map(|id| (r.id.as_str(), *id)));
    let Some((_, root)) = roots.next() else {
        return Err(SyncError::NoRoot);
    };
    for (key, id) in roots {
        tracing::warn!(key, "ignoring extra root claim");
        report.extra_roots.push(key.to_string());
        if let Some(node) = store.get_mut(id) {
            node.flags.is_root = false;
        }
    }

    // Validate
    validate::check_graph(&store, root, options)?;
    report.choice_cardinality = validate::choice_cardinality(&store);
    for entry in &report.choice_cardinality {
        tracing::debug!(
            key = %entry.key,
            continuations = entry.continuations,
            "choice does not lead to exactly one continuation"
        );
    }

    tracing::info!(
        nodes = store.len(),
        retained = report.retained.len(),
        created = report.created.len(),
        removed = report.removed.len(),
        anomalies = report.anomaly_count(),
        "story graph synchronized"
    );

    Ok(Synchronized { store, report })
}

/// Synchronize against a JSON graph cache. A blank cache means a first run.
pub fn synchronize_cached(
    source: &AuthoredSource,
    cache_json: &str,
    options: &SyncOptions,
) -> Result<Synchronized, SyncError> {
    let prior = NodeStore::from_cache_json(cache_json)?;
    synchronize(source, &prior, options)
}

fn check_unique_keys(source: &AuthoredSource) -> Result<(), SyncError> {
    let mut seen = HashSet::with_capacity(source.len());
    for record in source.iter() {
        if !seen.insert(record.id.as_str()) {
            return Err(SyncError::DuplicateKey {
                key: record.id.clone(),
            });
        }
    }
    Ok(())
}
