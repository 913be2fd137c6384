//! Attack tree construction by memoised backtracking over actual causes.
//!
//! Threats need every cause (AND); misbehaviours and trustworthiness
//! attributes need any one (OR). Revisiting a node already on the current path
//! yields a [`Loopback`] instead of recursing, which is what makes cyclic
//! causation graphs safe to walk.

use super::expression::LogicalExpr;
use super::node::{AttackNode, Loopback, Outcome, Traversal};
use crate::error::{Error, Result};
use crate::graph::{CausationGraph, NodeRef, RiskMode, ThreatId};
use crate::risk::consulted_control;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

pub struct AttackTree<'g> {
    graph: &'g CausationGraph,
    mode: RiskMode,
    include_normal_ops: bool,
    targets: Vec<NodeRef>,
    /// Nodes the bounded pass may visit
    bound: Option<BTreeSet<NodeRef>>,
    nodes: BTreeMap<NodeRef, AttackNode>,
    failures: BTreeMap<NodeRef, BTreeSet<NodeRef>>,
    /// Failed nodes of the unbounded pass, kept once the tree is rebuilt
    unbounded_failures: BTreeMap<NodeRef, BTreeSet<NodeRef>>,
}

impl<'g> AttackTree<'g> {
    /// Backtrace from every target. Unless `all_paths` is set the tree is then
    /// cut down to its shortest paths and rebuilt within that set.
    pub fn new(
        graph: &'g CausationGraph,
        targets: Vec<NodeRef>,
        mode: RiskMode,
        all_paths: bool,
        include_normal_ops: bool,
    ) -> Result<Self> {
        let mut tree = Self {
            graph,
            mode,
            include_normal_ops,
            targets,
            bound: None,
            nodes: BTreeMap::new(),
            failures: BTreeMap::new(),
            unbounded_failures: BTreeMap::new(),
        };
        tree.explore()?;
        if !all_paths {
            let keep = tree.shortest_path_nodes();
            debug!(visited = tree.nodes.len(), kept = keep.len(), "shortest path bound");
            tree.unbounded_failures = tree.failed_nodes();
            tree.nodes.clear();
            tree.failures.clear();
            tree.bound = Some(keep);
            tree.explore()?;
        }
        Ok(tree)
    }

    fn explore(&mut self) -> Result<()> {
        for target in self.targets.clone() {
            let mut path = BTreeSet::new();
            if let Err(lb) = self.backtrace(target, &mut path)? {
                debug!(target = self.graph.node_uri(target), loopback = lb.nodes.len(), "target unreachable");
            }
        }
        Ok(())
    }

    pub fn targets(&self) -> &[NodeRef] {
        &self.targets
    }

    pub fn node(&self, node: NodeRef) -> Option<&AttackNode> {
        self.nodes.get(&node).filter(|n| n.is_reached())
    }

    /// Every node resolved along at least one path.
    pub fn nodes(&self) -> impl Iterator<Item = &AttackNode> {
        self.nodes.values().filter(|n| n.is_reached())
    }

    /// Nodes that never resolved, with the nodes they looped back to. After a
    /// shortest-path rebuild this includes failures of the unbounded pass for
    /// nodes the rebuilt tree does not reach.
    pub fn failed_nodes(&self) -> BTreeMap<NodeRef, BTreeSet<NodeRef>> {
        let mut failed: BTreeMap<NodeRef, BTreeSet<NodeRef>> = self
            .unbounded_failures
            .iter()
            .filter(|(node, _)| self.node(**node).is_none())
            .map(|(&node, loops)| (node, loops.clone()))
            .collect();
        for n in self.nodes.values().filter(|n| !n.is_reached()) {
            failed.entry(n.node).or_default().extend(self.loopbacks(n.node));
        }
        failed
    }

    fn loopbacks(&self, node: NodeRef) -> BTreeSet<NodeRef> {
        self.failures.get(&node).cloned().unwrap_or_default()
    }

    pub fn root_cause(&self, target: NodeRef) -> LogicalExpr {
        self.node(target).map_or(LogicalExpr::False, |n| n.root_cause.clone())
    }

    /// Causes this pass follows from `node`.
    fn followed_causes(&self, node: NodeRef) -> Result<Vec<NodeRef>> {
        if !node.is_threat() && self.graph.is_external_cause(node) {
            return Ok(Vec::new());
        }
        let causes = self.graph.node_causes(node);
        if node.is_threat() && causes.is_empty() {
            return Err(Error::CauselessThreat {
                uri: self.graph.node_uri(node).to_string(),
            });
        }
        let normal = self.graph.is_normal_op(node);
        Ok(causes
            .into_iter()
            .filter(|&c| self.include_normal_ops || normal || !self.graph.is_normal_op(c))
            .filter(|c| self.bound.as_ref().map_or(true, |b| b.contains(c)))
            .collect())
    }

    pub(crate) fn backtrace(&mut self, node: NodeRef, path: &mut BTreeSet<NodeRef>) -> Result<Outcome> {
        if let Some(hit) = self.nodes.get(&node).and_then(|n| n.cached(path)) {
            return Ok(hit);
        }
        let causes = self.followed_causes(node)?;

        path.insert(node);
        let outcome = match node {
            NodeRef::Threat(t) => self.backtrace_threat(t, &causes, path),
            _ => self.backtrace_effect(node, &causes, path),
        };
        path.remove(&node);

        let outcome = match outcome? {
            Ok(mut tr) => {
                tr.deps.remove(&node);
                Ok(tr)
            }
            Err(mut lb) => {
                lb.nodes.remove(&node);
                trace!(node = self.graph.node_uri(node), loopback = lb.nodes.len(), "loopback");
                self.failures.entry(node).or_default().extend(lb.nodes.iter().copied());
                Err(lb)
            }
        };

        self.nodes
            .entry(node)
            .or_insert_with(|| AttackNode::new(node))
            .remember(&outcome);
        if let Ok(tr) = &outcome {
            for &cause in &tr.causes {
                self.nodes
                    .entry(cause)
                    .or_insert_with(|| AttackNode::new(cause))
                    .direct_effects
                    .insert(node);
            }
        }
        Ok(outcome)
    }

    fn backtrace_threat(&mut self, t: ThreatId, causes: &[NodeRef], path: &mut BTreeSet<NodeRef>) -> Result<Outcome> {
        let looped: BTreeSet<NodeRef> = causes.iter().filter(|c| path.contains(c)).copied().collect();
        if !looped.is_empty() {
            return Ok(Err(Loopback { nodes: looped }));
        }

        let mut parents = Vec::with_capacity(causes.len());
        for &cause in causes {
            match self.backtrace(cause, path)? {
                Ok(tr) => parents.push((cause, tr)),
                Err(lb) => return Ok(Err(lb)),
            }
        }

        let node = NodeRef::Threat(t);
        let threat = self.graph.threat(t);
        let normal = threat.flags.normal_operation;
        let same_class = parents
            .iter()
            .filter(|(c, _)| self.graph.is_normal_op(*c) == normal)
            .map(|(_, tr)| tr);
        let min_distance = 1 + same_class.clone().map(|tr| tr.min_distance).max().unwrap_or(0);
        let max_distance = 1 + same_class.map(|tr| tr.max_distance).max().unwrap_or(0);

        let root_cause = if threat.flags.root_cause || threat.flags.initial_cause || parents.is_empty() {
            LogicalExpr::var(self.graph.node_uri(node))
        } else {
            LogicalExpr::and(parents.iter().map(|(_, tr)| tr.root_cause.clone()))
        };

        let (own_cs, own_csg) = self.own_mitigation(t);
        let (attack_cs, attack_csg) = if normal {
            (LogicalExpr::False, LogicalExpr::False)
        } else {
            (own_cs.clone(), own_csg.clone())
        };
        let any = |own: LogicalExpr, pick: fn(&Traversal) -> &LogicalExpr| {
            LogicalExpr::or(std::iter::once(own).chain(parents.iter().map(|(_, tr)| pick(tr).clone())))
        };

        Ok(Ok(Traversal {
            root_cause,
            min_distance,
            max_distance,
            attack_mitigation_cs: any(attack_cs, |tr| &tr.attack_mitigation_cs),
            attack_mitigation_csg: any(attack_csg, |tr| &tr.attack_mitigation_csg),
            threat_mitigation_cs: any(own_cs, |tr| &tr.threat_mitigation_cs),
            threat_mitigation_csg: any(own_csg, |tr| &tr.threat_mitigation_csg),
            causes: parents.iter().map(|(c, _)| *c).collect(),
            deps: parents.iter().flat_map(|(_, tr)| tr.deps.iter().copied()).collect(),
        }))
    }

    fn backtrace_effect(&mut self, node: NodeRef, causes: &[NodeRef], path: &mut BTreeSet<NodeRef>) -> Result<Outcome> {
        if causes.is_empty() {
            return Ok(Ok(Traversal::base(self.graph.node_uri(node))));
        }

        let mut parents = Vec::with_capacity(causes.len());
        let mut deps = BTreeSet::new();
        let mut looped = BTreeSet::new();
        for &cause in causes {
            if path.contains(&cause) {
                looped.insert(cause);
                deps.insert(cause);
                continue;
            }
            match self.backtrace(cause, path)? {
                Ok(tr) => {
                    deps.extend(tr.deps.iter().copied());
                    parents.push((cause, tr));
                }
                Err(lb) => {
                    deps.extend(lb.nodes.iter().copied());
                    looped.extend(lb.nodes);
                }
            }
        }
        if parents.is_empty() {
            return Ok(Err(Loopback { nodes: looped }));
        }

        let all = |pick: fn(&Traversal) -> &LogicalExpr| LogicalExpr::and(parents.iter().map(|(_, tr)| pick(tr).clone()));
        Ok(Ok(Traversal {
            root_cause: LogicalExpr::or(parents.iter().map(|(_, tr)| tr.root_cause.clone())),
            min_distance: 1 + parents.iter().map(|(_, tr)| tr.min_distance).min().unwrap_or(0),
            max_distance: 1 + parents.iter().map(|(_, tr)| tr.max_distance).max().unwrap_or(0),
            attack_mitigation_cs: all(|tr| &tr.attack_mitigation_cs),
            attack_mitigation_csg: all(|tr| &tr.attack_mitigation_csg),
            threat_mitigation_cs: all(|tr| &tr.threat_mitigation_cs),
            threat_mitigation_csg: all(|tr| &tr.threat_mitigation_csg),
            causes: parents.iter().map(|(c, _)| *c).collect(),
            deps,
        }))
    }

    /// Ways to block the threat itself: each applicable strategy not yet in
    /// force, as the AND of its inactive mandatory controls, and as itself.
    fn own_mitigation(&self, t: ThreatId) -> (LogicalExpr, LogicalExpr) {
        let mut by_controls = Vec::new();
        let mut by_strategies = Vec::new();
        for g in self.graph.threat(t).controlling_strategies() {
            let strategy = self.graph.strategy(g);
            if strategy.enabled || !strategy.applies_in(self.mode) || strategy.mandatory.is_empty() {
                continue;
            }
            by_controls.push(LogicalExpr::and(
                strategy
                    .mandatory
                    .iter()
                    .map(|&cs| self.graph.control(consulted_control(self.graph, g, cs, true)))
                    .filter(|cs| !cs.effective_active)
                    .map(|cs| LogicalExpr::var(cs.uri.as_str())),
            ));
            by_strategies.push(LogicalExpr::var(strategy.uri.as_str()));
        }
        (LogicalExpr::or(by_controls), LogicalExpr::or(by_strategies))
    }

    /// Keep only nodes that are strictly closer causes of a surviving effect,
    /// until nothing more can be dropped. Targets always survive.
    fn shortest_path_nodes(&self) -> BTreeSet<NodeRef> {
        let mut keep: BTreeSet<NodeRef> = self.nodes().map(|n| n.node).collect();
        loop {
            let next: BTreeSet<NodeRef> = keep
                .iter()
                .copied()
                .filter(|n| self.targets.contains(n) || self.is_closer_cause(*n, &keep))
                .collect();
            if next.len() == keep.len() {
                return keep;
            }
            keep = next;
        }
    }

    fn is_closer_cause(&self, node: NodeRef, keep: &BTreeSet<NodeRef>) -> bool {
        let Some(state) = self.nodes.get(&node) else {
            return false;
        };
        let distance = state.min_distance();
        let boundary = self.graph.is_normal_op(node);
        state.direct_effects.iter().filter(|e| keep.contains(e)).any(|&effect| {
            let closer = self.nodes.get(&effect).map_or(false, |e| distance < e.min_distance());
            closer || (boundary && !self.graph.is_normal_op(effect))
        })
    }

    /// Longest cycle-free distance from `target` to each node behind it.
    pub fn distances_from(&self, target: NodeRef) -> BTreeMap<NodeRef, usize> {
        let mut best = BTreeMap::new();
        let mut on_path = BTreeSet::new();
        if self.node(target).is_some() {
            self.walk(target, 0, &mut on_path, &mut best);
        }
        best
    }

    fn walk(&self, node: NodeRef, depth: usize, on_path: &mut BTreeSet<NodeRef>, best: &mut BTreeMap<NodeRef, usize>) {
        if on_path.contains(&node) || best.get(&node).map_or(false, |&d| d >= depth) {
            return;
        }
        best.insert(node, depth);
        let Some(state) = self.node(node) else {
            return;
        };
        on_path.insert(node);
        for &cause in &state.direct_causes {
            if self.node(cause).is_some() {
                self.walk(cause, depth + 1, on_path, best);
            }
        }
        on_path.remove(&node);
    }
}
