//! Record of what a synchronization pass changed or tolerated.

use serde::{Deserialize, Serialize};
use story_graph::NodeId;

/// An authored child reference that did not resolve and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedLink {
    /// External key of the node declaring the link.
    pub parent: String,
    /// The unresolved child key.
    pub child: String,
}

/// A node whose kind changed between authorings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindChange {
    pub key: String,
    /// The retired ID.
    pub previous: NodeId,
    /// The freshly minted ID.
    pub current: NodeId,
}

/// A choice that does not lead to exactly one story continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCardinality {
    pub key: String,
    pub continuations: usize,
}

/// Summary of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Prior nodes whose identity was kept.
    pub retained: Vec<NodeId>,

    /// Nodes minted in this pass.
    pub created: Vec<NodeId>,

    /// Prior nodes pruned because no authored record matched them.
    pub removed: Vec<NodeId>,

    pub kind_changed: Vec<KindChange>,

    pub dropped_links: Vec<DroppedLink>,

    /// Keys of records that claimed root after the first one.
    pub extra_roots: Vec<String>,

    pub choice_cardinality: Vec<ChoiceCardinality>,
}

impl SyncReport {
    /// True when nothing was tolerated or repaired.
    ///
    /// Retained, created, and removed nodes are normal outcomes and do not
    /// count against a clean pass.
    pub fn is_clean(&self) -> bool {
        self.kind_changed.is_empty()
            && self.dropped_links.is_empty()
            && self.extra_roots.is_empty()
            && self.choice_cardinality.is_empty()
    }

    /// Total number of anomalies recorded.
    pub fn anomaly_count(&self) -> usize {
        self.kind_changed.len()
            + self.dropped_links.len()
            + self.extra_roots.len()
            + self.choice_cardinality.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_is_clean() {
        let report = SyncReport::default();
        assert!(report.is_clean());
        assert_eq!(report.anomaly_count(), 0);
    }

    #[test]
    fn test_created_nodes_keep_report_clean() {
        let report = SyncReport {
            created: vec![NodeId::new()],
            removed: vec![NodeId::new()],
            ..Default::default()
        };
        assert!(report.is_clean());
    }

    #[test]
    fn test_anomalies_counted() {
        let report = SyncReport {
            dropped_links: vec![DroppedLink {
                parent: "a".to_string(),
                child: "ghost".to_string(),
            }],
            extra_roots: vec!["b".to_string()],
            ..Default::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.anomaly_count(), 2);
    }
}
