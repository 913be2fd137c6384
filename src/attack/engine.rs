//! Builds attack-tree reports over a propagated causation graph.

use super::expression::LogicalExpr;
use super::report::{AttackTreeReport, LinkKind, LinkView, NodeView, TargetTree};
use super::tree::AttackTree;
use crate::config::AttackPathConfig;
use crate::error::{Error, Result};
use crate::graph::{CausationGraph, EntityRef, NodeRef, RiskMode};
use crate::scale::ScaleSet;
use std::collections::BTreeMap;
use tracing::{info, info_span};

pub struct AttackPathEngine<'g> {
    graph: &'g CausationGraph,
    scales: &'g ScaleSet,
    config: AttackPathConfig,
}

impl<'g> AttackPathEngine<'g> {
    pub fn new(graph: &'g CausationGraph, scales: &'g ScaleSet, config: AttackPathConfig) -> Self {
        Self { graph, scales, config }
    }

    /// Build for the configured targets and options.
    pub fn run(&self, mode: RiskMode) -> Result<AttackTreeReport> {
        self.build_tree(
            &self.config.targets,
            mode,
            self.config.all_paths,
            self.config.include_normal_ops,
        )
    }

    /// Resolve every target up front so a bad request fails before any traversal.
    fn resolve_targets(&self, targets: &[String]) -> Result<Vec<NodeRef>> {
        targets
            .iter()
            .map(|uri| match self.graph.lookup(uri) {
                None => Err(Error::UnknownTarget { uri: uri.clone() }),
                Some(EntityRef::Node(node @ NodeRef::Misbehaviour(_))) => Ok(node),
                Some(_) => Err(Error::InvalidTarget { uri: uri.clone() }),
            })
            .collect()
    }

    pub fn build_tree(
        &self,
        targets: &[String],
        mode: RiskMode,
        all_paths: bool,
        include_normal_ops: bool,
    ) -> Result<AttackTreeReport> {
        let nodes = self.resolve_targets(targets)?;
        let span = info_span!("attack_tree", targets = targets.len(), all_paths, include_normal_ops);
        let _guard = span.enter();

        let tree = AttackTree::new(self.graph, nodes, mode, all_paths, include_normal_ops)?;

        let per_target: BTreeMap<String, TargetTree> = tree
            .targets()
            .iter()
            .map(|&target| Ok((self.graph.node_uri(target).to_string(), self.target_tree(&tree, target)?)))
            .collect::<Result<_>>()?;
        let failed = tree
            .failed_nodes()
            .into_iter()
            .map(|(node, loopback)| {
                (
                    self.graph.node_uri(node).to_string(),
                    loopback.into_iter().map(|n| self.graph.node_uri(n).to_string()).collect(),
                )
            })
            .collect::<BTreeMap<_, Vec<_>>>();

        info!(
            nodes = tree.nodes().count(),
            failed = failed.len(),
            "attack trees built"
        );
        Ok(AttackTreeReport {
            mode,
            all_paths,
            include_normal_ops,
            per_target,
            failed,
        })
    }

    fn render(&self, expr: &LogicalExpr) -> String {
        expr.to_dnf(self.config.dnf_max_terms)
            .unwrap_or_else(|| expr.clone())
            .to_string()
    }

    fn target_tree(&self, tree: &AttackTree<'_>, target: NodeRef) -> Result<TargetTree> {
        let Some(root) = tree.node(target) else {
            let unreachable = LogicalExpr::False.to_string();
            return Ok(TargetTree {
                root_cause: unreachable.clone(),
                attack_mitigation_cs: unreachable.clone(),
                attack_mitigation_csg: unreachable.clone(),
                threat_mitigation_cs: unreachable.clone(),
                threat_mitigation_csg: unreachable,
                ..TargetTree::default()
            });
        };
        let distances = tree.distances_from(target);
        let mut out = TargetTree {
            root_cause: self.render(&root.root_cause),
            attack_mitigation_cs: self.render(&root.attack_mitigation_cs),
            attack_mitigation_csg: self.render(&root.attack_mitigation_csg),
            threat_mitigation_cs: self.render(&root.threat_mitigation_cs),
            threat_mitigation_csg: self.render(&root.threat_mitigation_csg),
            ..TargetTree::default()
        };

        for (&node, &target_distance) in &distances {
            let Some(state) = tree.node(node) else {
                continue;
            };
            let view = self.node_view(node, state.min_distance(), state.max_distance(), target_distance)?;
            match node {
                NodeRef::Threat(_) => out.threats.push(view),
                NodeRef::Misbehaviour(_) => out.misbehaviours.push(view),
                NodeRef::Trustworthiness(_) => out.twas.push(view),
            }
            for &cause in state.direct_causes.iter().filter(|c| distances.contains_key(c)) {
                out.links.push(LinkView {
                    source: self.graph.node_uri(cause).to_string(),
                    target: self.graph.node_uri(node).to_string(),
                    kind: if cause.is_threat() {
                        LinkKind::Causes
                    } else {
                        LinkKind::Enables
                    },
                });
            }
        }
        Ok(out)
    }

    fn node_view(&self, node: NodeRef, min_distance: usize, max_distance: usize, target_distance: usize) -> Result<NodeView> {
        let (root_cause, initial_cause) = match node {
            NodeRef::Threat(t) => {
                let flags = &self.graph.threat(t).flags;
                (flags.root_cause, flags.initial_cause)
            }
            _ => (false, false),
        };
        let likelihood = self.scales.uri(self.graph.node_likelihood(node, self.scales)?).to_string();
        Ok(NodeView {
            uri: self.graph.node_uri(node).to_string(),
            label: self.graph.node_label(node).to_string(),
            likelihood,
            min_distance,
            max_distance,
            target_distance,
            root_cause,
            initial_cause,
            normal_operation: self.graph.is_normal_op(node),
            external_cause: self.graph.is_external_cause(node),
        })
    }
}
