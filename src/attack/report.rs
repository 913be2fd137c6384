//! Serialisable view of attack trees, one per target misbehaviour.

use crate::graph::RiskMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// A threat causing a misbehaviour or attribute loss
    Causes,
    /// A misbehaviour or attribute enabling a threat
    Enables,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkView {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub uri: String,
    pub label: String,
    pub likelihood: String,
    pub min_distance: usize,
    pub max_distance: usize,
    /// Longest cycle-free distance from the target
    pub target_distance: usize,
    pub root_cause: bool,
    pub initial_cause: bool,
    pub normal_operation: bool,
    pub external_cause: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTree {
    pub threats: Vec<NodeView>,
    pub misbehaviours: Vec<NodeView>,
    pub twas: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub root_cause: String,
    pub attack_mitigation_cs: String,
    pub attack_mitigation_csg: String,
    pub threat_mitigation_cs: String,
    pub threat_mitigation_csg: String,
}

impl TargetTree {
    pub fn node_uris(&self) -> impl Iterator<Item = &str> {
        self.threats
            .iter()
            .chain(&self.misbehaviours)
            .chain(&self.twas)
            .map(|n| n.uri.as_str())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.node_uris().any(|u| u == uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTreeReport {
    pub mode: RiskMode,
    pub all_paths: bool,
    pub include_normal_ops: bool,
    pub per_target: BTreeMap<String, TargetTree>,
    /// Nodes that never resolved, with the URIs they looped back to
    pub failed: BTreeMap<String, Vec<String>>,
}
