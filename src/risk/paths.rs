//! Stage 5: classify threats as initial causes (normal operation), root causes
//! (attack) and record indirect effects.
//!
//! A threat joins a path only once every one of its actual causes has been
//! reached, so cyclic support never bootstraps itself.

use crate::graph::{CausationGraph, MsId, NodeRef, Threat, ThreatId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

#[derive(Debug, Default)]
struct Reach {
    threats: BTreeMap<ThreatId, BTreeSet<NodeRef>>,
    effects: BTreeMap<NodeRef, BTreeSet<NodeRef>>,
}

/// Grow reach-sets from `seeds` through admitted threats until stable. Each
/// reached node maps to the seeds it was reached from.
fn forward_reach(graph: &CausationGraph, seeds: &BTreeSet<NodeRef>, admit: impl Fn(&Threat) -> bool) -> Reach {
    let mut reach = Reach::default();
    for &seed in seeds {
        reach.effects.entry(seed).or_default().insert(seed);
    }

    loop {
        let mut grew = false;
        for t in graph.threat_ids() {
            let threat = graph.threat(t);
            if threat.skipped || threat.caused_by.is_empty() || !admit(threat) {
                continue;
            }
            if !threat.caused_by.iter().all(|c| reach.effects.contains_key(c)) {
                continue;
            }
            let origins: BTreeSet<NodeRef> = threat
                .caused_by
                .iter()
                .flat_map(|c| reach.effects[c].iter().copied())
                .collect();
            let entry = reach.threats.entry(t).or_default();
            if !origins.is_subset(entry) {
                entry.extend(origins);
                grew = true;
            }
        }

        for (&t, origins) in &reach.threats {
            for &m in &graph.threat(t).direct_effects {
                let mut targets = vec![NodeRef::Misbehaviour(m)];
                if let Some(x) = graph.misbehaviour(m).twas {
                    if graph.twas(x).caused_by == Some(m) {
                        targets.push(NodeRef::Trustworthiness(x));
                    }
                }
                for node in targets {
                    let entry = reach.effects.entry(node).or_default();
                    let before = entry.len();
                    entry.extend(origins.iter().copied());
                    grew |= entry.len() != before;
                }
            }
        }

        if !grew {
            return reach;
        }
    }
}

/// Whether `t` can sit on a normal-operation path: a normal-operation threat, or
/// a secondary threat fed only by external causes.
fn on_normal_path(graph: &CausationGraph, t: &Threat) -> bool {
    t.flags.normal_operation
        || (t.flags.secondary_threat && t.caused_by.iter().all(|&c| graph.is_external_cause(c)))
}

/// Mark misbehaviours reachable from normal operation and the threats that
/// start such paths. Returns the number of initial causes.
pub(crate) fn calculate_normal_operation_paths(graph: &mut CausationGraph) -> usize {
    let seeds: BTreeSet<NodeRef> = graph
        .threats()
        .iter()
        .filter(|t| !t.skipped && (t.flags.normal_operation || t.flags.secondary_threat))
        .flat_map(|t| t.caused_by.iter().copied())
        .filter(|&c| graph.is_external_cause(c))
        .collect();
    let reach = forward_reach(graph, &seeds, |t| on_normal_path(graph, t));

    for node in reach.effects.keys() {
        if let NodeRef::Misbehaviour(m) = *node {
            if !seeds.contains(node) {
                graph.misbehaviour_mut(m).normal_op_effect = true;
            }
        }
    }
    let mut initial = 0;
    for &t in reach.threats.keys() {
        if graph.threat(t).caused_by.iter().all(|c| seeds.contains(c)) {
            graph.threat_mut(t).flags.initial_cause = true;
            initial += 1;
        }
    }
    debug!(seeds = seeds.len(), reached = reach.threats.len(), initial, "normal operation paths");
    initial
}

/// Mark threats that start attack paths from external causes or normal-operation
/// effects. Initial causes are never also root causes. Returns the number of root causes.
pub(crate) fn calculate_attack_paths(graph: &mut CausationGraph) -> usize {
    let mut seeds: BTreeSet<NodeRef> = BTreeSet::new();
    for m in graph.misbehaviour_ids() {
        let ms = graph.misbehaviour(m);
        if ms.external_cause || ms.normal_op_effect {
            seeds.insert(NodeRef::Misbehaviour(m));
        }
    }
    for x in graph.twas_ids() {
        let node = NodeRef::Trustworthiness(x);
        if graph.is_external_cause(node) || graph.is_normal_op(node) {
            seeds.insert(node);
        }
    }
    let reach = forward_reach(graph, &seeds, |t| !t.flags.normal_operation && !t.flags.initial_cause);

    let mut roots = 0;
    for &t in reach.threats.keys() {
        if graph.threat(t).caused_by.iter().all(|c| seeds.contains(c)) {
            graph.threat_mut(t).flags.root_cause = true;
            roots += 1;
        }
    }
    debug!(seeds = seeds.len(), reached = reach.threats.len(), roots, "attack paths");

    record_indirect_effects(graph);
    roots
}

/// For every root or initial cause, collect the threats and misbehaviours
/// that follow from its direct effects.
fn record_indirect_effects(graph: &mut CausationGraph) {
    for t in graph.threat_ids().collect::<Vec<_>>() {
        let threat = graph.threat(t);
        if !(threat.flags.root_cause || threat.flags.initial_cause) {
            continue;
        }
        let direct: BTreeSet<MsId> = threat.direct_effects.iter().copied().collect();
        let mut seen_ms = direct.clone();
        let mut threats: BTreeSet<ThreatId> = BTreeSet::new();
        let mut effects: BTreeSet<MsId> = BTreeSet::new();
        let mut queue: VecDeque<MsId> = direct.iter().copied().collect();

        while let Some(m) = queue.pop_front() {
            for next in graph.enabled_threats(m) {
                if next == t || !threats.insert(next) {
                    continue;
                }
                for &effect in &graph.threat(next).direct_effects {
                    if seen_ms.insert(effect) {
                        effects.insert(effect);
                        queue.push_back(effect);
                    }
                }
            }
        }

        let threat = graph.threat_mut(t);
        threat.indirect_threats = threats.into_iter().collect();
        threat.indirect_effects = effects.into_iter().collect();
    }
}
