//! Stage 1: reset computed state, reconcile triplets, enable strategies and
//! derive per-cause suppression floors.

use crate::error::Result;
use crate::graph::triplet::{reconcile_activation, reconcile_levels, trigger_extreme};
use crate::graph::{CausationGraph, CsId, CsgId, NodeRef, RiskMode, ThreatId, TripletRole};
use crate::scale::{Level, ScaleSet};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Likelihood ceilings that optional controls of enabled triggering strategies
/// impose on individual causes of a threat.
#[derive(Debug, Default)]
pub struct Suppression {
    floors: HashMap<(ThreatId, NodeRef), Level>,
}

impl Suppression {
    pub fn cap(&self, threat: ThreatId, cause: NodeRef) -> Option<Level> {
        self.floors.get(&(threat, cause)).copied()
    }

    /// `likelihood` of `cause` as seen by `threat`.
    pub fn apply(&self, threat: ThreatId, cause: NodeRef, likelihood: Level) -> Level {
        match self.cap(threat, cause) {
            Some(cap) => likelihood.min(cap),
            None => likelihood,
        }
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}

pub(crate) fn initialise(
    graph: &mut CausationGraph,
    scales: &ScaleSet,
    mode: RiskMode,
) -> Result<Suppression> {
    reset(graph, scales);
    reconcile_triplets(graph);
    enable_strategies(graph, scales, mode);
    let suppression = suppression_floors(graph, scales)?;
    debug!(floors = suppression.len(), "initialised");
    Ok(suppression)
}

fn reset(graph: &mut CausationGraph, scales: &ScaleSet) {
    let lowest_lh = scales.likelihood.lowest();
    let lowest_risk = scales.risk.lowest();
    let top_tw = scales.trustworthiness.highest();
    let lowest_impact = scales.impact.lowest();

    for id in graph.threat_ids().collect::<Vec<_>>() {
        let t = graph.threat_mut(id);
        t.likelihood = lowest_lh;
        t.risk = lowest_risk;
        t.skipped = false;
        t.flags.initial_cause = false;
        t.flags.root_cause = false;
        t.caused_by.clear();
        t.direct_effects.clear();
        t.indirect_effects.clear();
        t.indirect_threats.clear();
    }
    for id in graph.misbehaviour_ids().collect::<Vec<_>>() {
        let m = graph.misbehaviour_mut(id);
        m.likelihood = lowest_lh;
        m.impact = m.asserted_impact.unwrap_or(lowest_impact);
        m.risk = lowest_risk;
        m.external_cause = false;
        m.normal_op_effect = false;
        m.caused_threats.clear();
        m.caused_by.clear();
    }
    for id in graph.twas_ids().collect::<Vec<_>>() {
        let t = graph.twas_mut(id);
        t.baseline_level = t.asserted_level.unwrap_or(top_tw);
        t.inferred_level = t.baseline_level;
        t.external_cause = false;
        t.caused_threats.clear();
        t.caused_by = None;
    }
    for i in 0..graph.controls().len() {
        let c = graph.control_mut(CsId::new(i));
        c.effective_active = c.active;
        c.effective_coverage = c.coverage.unwrap_or(top_tw);
    }
}

/// Move inconsistent min/max members onto their average. Logged, never fatal.
fn reconcile_triplets(graph: &mut CausationGraph) {
    for id in graph.twas_ids().collect::<Vec<_>>() {
        let Some(TripletRole::Average { min, max }) = graph.twas(id).triplet else {
            continue;
        };
        let avg = graph.twas(id).baseline_level;
        let r = reconcile_levels(
            min.map(|m| graph.twas(m).baseline_level),
            avg,
            max.map(|m| graph.twas(m).baseline_level),
        );
        if r.adjusted {
            warn!(twas = %graph.twas(id).uri, "inconsistent trustworthiness triplet adjusted to average");
        }
        if let (Some(m), Some(level)) = (min, r.min) {
            let t = graph.twas_mut(m);
            t.baseline_level = level;
            t.inferred_level = level;
        }
        if let (Some(m), Some(level)) = (max, r.max) {
            let t = graph.twas_mut(m);
            t.baseline_level = level;
            t.inferred_level = level;
        }
    }

    for id in graph.misbehaviour_ids().collect::<Vec<_>>() {
        let Some(TripletRole::Average { min, max }) = graph.misbehaviour(id).triplet else {
            continue;
        };
        let r = reconcile_levels(
            min.map(|m| graph.misbehaviour(m).impact),
            graph.misbehaviour(id).impact,
            max.map(|m| graph.misbehaviour(m).impact),
        );
        if r.adjusted {
            warn!(misbehaviour = %graph.misbehaviour(id).uri, "inconsistent impact triplet adjusted to average");
        }
        if let (Some(m), Some(level)) = (min, r.min) {
            graph.misbehaviour_mut(m).impact = level;
        }
        if let (Some(m), Some(level)) = (max, r.max) {
            graph.misbehaviour_mut(m).impact = level;
        }
    }

    for i in 0..graph.controls().len() {
        let id = CsId::new(i);
        let Some(TripletRole::Average { min, max }) = graph.control(id).triplet else {
            continue;
        };
        let avg = graph.control(id);
        let (avg_active, avg_coverage, uri) = (avg.effective_active, avg.effective_coverage, avg.uri.clone());
        let coverage = reconcile_levels(
            min.map(|m| graph.control(m).effective_coverage),
            avg_coverage,
            max.map(|m| graph.control(m).effective_coverage),
        );
        let (min_active, max_active, active_adjusted) = reconcile_activation(
            min.map(|m| graph.control(m).effective_active),
            avg_active,
            max.map(|m| graph.control(m).effective_active),
        );
        if coverage.adjusted || active_adjusted {
            warn!(control = %uri, "inconsistent control triplet adjusted to average");
        }
        if let Some(m) = min {
            let c = graph.control_mut(m);
            c.effective_coverage = coverage.min.unwrap_or(c.effective_coverage);
            c.effective_active = min_active.unwrap_or(c.effective_active);
        }
        if let Some(m) = max {
            let c = graph.control_mut(m);
            c.effective_coverage = coverage.max.unwrap_or(c.effective_coverage);
            c.effective_active = max_active.unwrap_or(c.effective_active);
        }
    }
}

/// The control set a strategy actually consults, after trigger-role selection.
pub(crate) fn consulted_control(graph: &CausationGraph, csg: CsgId, cs: CsId, mandatory: bool) -> CsId {
    match graph.strategy(csg).trigger_role {
        Some(role) => graph.control_member(cs, trigger_extreme(role, mandatory)),
        None => cs,
    }
}

fn enable_strategies(graph: &mut CausationGraph, scales: &ScaleSet, mode: RiskMode) {
    let top_tw = scales.trustworthiness.highest();
    for id in graph.strategy_ids().collect::<Vec<_>>() {
        let strategy = graph.strategy(id);
        let mandatory: Vec<CsId> = strategy
            .mandatory
            .iter()
            .map(|&cs| consulted_control(graph, id, cs, true))
            .collect();
        let enabled = strategy.applies_in(mode)
            && !mandatory.is_empty()
            && mandatory.iter().all(|&cs| graph.control(cs).effective_active);
        let coverage = mandatory
            .iter()
            .map(|&cs| graph.control(cs).effective_coverage)
            .min()
            .unwrap_or(top_tw);
        let coverage = match strategy.blocking_effect {
            Some(cap) => coverage.min(cap),
            None => coverage,
        };
        let s = graph.strategy_mut(id);
        s.enabled = enabled;
        s.coverage = coverage;
    }
}

fn suppression_floors(graph: &CausationGraph, scales: &ScaleSet) -> Result<Suppression> {
    let mut floors: HashMap<(ThreatId, NodeRef), Level> = HashMap::new();
    for t in graph.threat_ids() {
        let threat = graph.threat(t);
        for &g in &threat.triggered_by {
            let strategy = graph.strategy(g);
            if !strategy.enabled {
                continue;
            }
            for &cs in &strategy.optional {
                let control = graph.control(consulted_control(graph, g, cs, false));
                if !control.effective_active {
                    continue;
                }
                let cap = scales.likelihood_of(control.effective_coverage)?;
                for (cause, _) in threat.potential_causes() {
                    if graph.node_asset(cause) != Some(control.asset) {
                        continue;
                    }
                    floors
                        .entry((t, cause))
                        .and_modify(|l| *l = (*l).min(cap))
                        .or_insert(cap);
                }
            }
        }
    }
    Ok(Suppression { floors })
}
