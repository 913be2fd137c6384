//! Per-node state of an attack tree and the outcome of one backtrace.

use super::expression::LogicalExpr;
use crate::graph::NodeRef;
use std::collections::{BTreeMap, BTreeSet};

/// Successful resolution of a node along one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    pub root_cause: LogicalExpr,
    pub min_distance: usize,
    pub max_distance: usize,
    pub attack_mitigation_cs: LogicalExpr,
    pub attack_mitigation_csg: LogicalExpr,
    pub threat_mitigation_cs: LogicalExpr,
    pub threat_mitigation_csg: LogicalExpr,
    /// Causes that resolved on this path
    pub causes: BTreeSet<NodeRef>,
    /// Path nodes whose presence made some parent fail
    pub deps: BTreeSet<NodeRef>,
}

impl Traversal {
    /// A node with nothing behind it: its own root cause, unmitigable.
    pub(crate) fn base(uri: &str) -> Self {
        Self {
            root_cause: LogicalExpr::var(uri),
            min_distance: 0,
            max_distance: 0,
            attack_mitigation_cs: LogicalExpr::False,
            attack_mitigation_csg: LogicalExpr::False,
            threat_mitigation_cs: LogicalExpr::False,
            threat_mitigation_csg: LogicalExpr::False,
            causes: BTreeSet::new(),
            deps: BTreeSet::new(),
        }
    }
}

/// The node cannot be reached on this path without revisiting `nodes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loopback {
    pub nodes: BTreeSet<NodeRef>,
}

pub(crate) type Outcome = std::result::Result<Traversal, Loopback>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distance {
    pub min: usize,
    pub max: usize,
}

/// Everything learned about one node across all paths explored so far.
#[derive(Debug, Clone)]
pub struct AttackNode {
    pub node: NodeRef,
    pub direct_causes: BTreeSet<NodeRef>,
    pub direct_effects: BTreeSet<NodeRef>,
    /// Distance from root, per distinct root-cause expression
    pub distances: BTreeMap<String, Distance>,
    pub root_cause: LogicalExpr,
    pub attack_mitigation_cs: LogicalExpr,
    pub attack_mitigation_csg: LogicalExpr,
    pub threat_mitigation_cs: LogicalExpr,
    pub threat_mitigation_csg: LogicalExpr,
    cache: Vec<Outcome>,
}

impl AttackNode {
    pub(crate) fn new(node: NodeRef) -> Self {
        Self {
            node,
            direct_causes: BTreeSet::new(),
            direct_effects: BTreeSet::new(),
            distances: BTreeMap::new(),
            root_cause: LogicalExpr::False,
            attack_mitigation_cs: LogicalExpr::True,
            attack_mitigation_csg: LogicalExpr::True,
            threat_mitigation_cs: LogicalExpr::True,
            threat_mitigation_csg: LogicalExpr::True,
            cache: Vec::new(),
        }
    }

    /// Resolved along at least one path.
    pub fn is_reached(&self) -> bool {
        !self.distances.is_empty()
    }

    pub fn min_distance(&self) -> usize {
        self.distances.values().map(|d| d.min).min().unwrap_or(0)
    }

    pub fn max_distance(&self) -> usize {
        self.distances.values().map(|d| d.max).max().unwrap_or(0)
    }

    /// A cached outcome that holds for `path`, if any.
    ///
    /// A failure recurs whenever every node it looped back to is on the path.
    /// A success holds if none of its causes is on the path and every node it
    /// depended on still is.
    pub(crate) fn cached(&self, path: &BTreeSet<NodeRef>) -> Option<Outcome> {
        self.cache.iter().rev().find_map(|entry| match entry {
            Err(lb) if lb.nodes.is_subset(path) => Some(entry.clone()),
            Ok(tr) if tr.causes.is_disjoint(path) && tr.deps.is_subset(path) => Some(entry.clone()),
            _ => None,
        })
    }

    pub(crate) fn remember(&mut self, outcome: &Outcome) {
        self.cache.push(outcome.clone());
        if let Ok(tr) = outcome {
            self.merge(tr);
        }
    }

    /// Fold another path in: roots combine with OR, mitigations with AND.
    fn merge(&mut self, tr: &Traversal) {
        self.direct_causes.extend(tr.causes.iter().copied());
        self.distances
            .entry(tr.root_cause.to_string())
            .and_modify(|d| {
                d.min = d.min.min(tr.min_distance);
                d.max = d.max.max(tr.max_distance);
            })
            .or_insert(Distance {
                min: tr.min_distance,
                max: tr.max_distance,
            });
        self.root_cause = LogicalExpr::or([self.root_cause.clone(), tr.root_cause.clone()]);
        self.attack_mitigation_cs = LogicalExpr::and([self.attack_mitigation_cs.clone(), tr.attack_mitigation_cs.clone()]);
        self.attack_mitigation_csg = LogicalExpr::and([self.attack_mitigation_csg.clone(), tr.attack_mitigation_csg.clone()]);
        self.threat_mitigation_cs = LogicalExpr::and([self.threat_mitigation_cs.clone(), tr.threat_mitigation_cs.clone()]);
        self.threat_mitigation_csg = LogicalExpr::and([self.threat_mitigation_csg.clone(), tr.threat_mitigation_csg.clone()]);
    }
}
