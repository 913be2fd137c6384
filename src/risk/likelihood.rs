//! Stage 2: threat and misbehaviour likelihood, iterated to a fixed point.
//!
//! Levels only ever rise (misbehaviours) or fall (trustworthiness), and both
//! scales are finite, so the loop terminates.

use super::Context;
use crate::error::Result;
use crate::graph::{AssetId, CausationGraph, NodeRef, ThreatId};
use crate::scale::Level;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Causes sharing a role on the same asset are alternatives; a cause without a
/// role is its own group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CauseGroup<'a> {
    Role(Option<AssetId>, &'a str),
    Single(NodeRef),
}

/// Run the likelihood fixed point; returns the number of passes taken.
pub(crate) fn calculate_threat_likelihood(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<usize> {
    mark_skipped(graph, ctx);

    let mut iterations = 0;
    loop {
        iterations += 1;
        for t in graph.threat_ids().collect::<Vec<_>>() {
            if graph.threat(t).skipped {
                continue;
            }
            let likelihood = threat_likelihood(graph, ctx, t)?;
            graph.threat_mut(t).likelihood = likelihood;
        }
        let raised = raise_misbehaviours(graph, ctx)?;
        let lowered = lower_trustworthiness(graph, ctx)?;
        trace!(iteration = iterations, raised, lowered, "likelihood pass");
        if raised == 0 && lowered == 0 {
            break;
        }
    }
    debug!(iterations, "threat likelihood converged");
    Ok(iterations)
}

fn mark_skipped(graph: &mut CausationGraph, ctx: &Context<'_>) {
    for t in graph.threat_ids().collect::<Vec<_>>() {
        let threat = graph.threat(t);
        let untriggered = threat.flags.triggered
            && !threat.triggered_by.iter().any(|&g| graph.strategy(g).enabled);
        let skipped = !threat.has_declared_causes() || !threat.flags.applies_in(ctx.mode) || untriggered;
        graph.threat_mut(t).skipped = skipped;
    }
}

/// Likelihood of `cause` as the threat `t` sees it, after suppression.
pub(crate) fn effective_cause_likelihood(
    graph: &CausationGraph,
    ctx: &Context<'_>,
    t: ThreatId,
    cause: NodeRef,
) -> Result<Level> {
    let likelihood = graph.node_likelihood(cause, ctx.scales)?;
    Ok(ctx.suppression.apply(t, cause, likelihood))
}

/// Min over role groups of the max within each group, then capped by enabled
/// blocking strategies and the threat's frequency.
fn threat_likelihood(graph: &CausationGraph, ctx: &Context<'_>, t: ThreatId) -> Result<Level> {
    let threat = graph.threat(t);
    let mut groups: BTreeMap<CauseGroup<'_>, Level> = BTreeMap::new();
    for (cause, role) in threat.potential_causes() {
        let likelihood = effective_cause_likelihood(graph, ctx, t, cause)?;
        let key = match role {
            Some(role) => CauseGroup::Role(graph.node_asset(cause), role),
            None => CauseGroup::Single(cause),
        };
        groups
            .entry(key)
            .and_modify(|l| *l = (*l).max(likelihood))
            .or_insert(likelihood);
    }
    let mut likelihood = groups
        .values()
        .min()
        .copied()
        .unwrap_or_else(|| ctx.scales.likelihood.lowest());

    for g in threat.controlling_strategies() {
        let strategy = graph.strategy(g);
        if strategy.enabled && strategy.optional.is_empty() {
            likelihood = likelihood.min(ctx.scales.likelihood_of(strategy.coverage)?);
        }
    }
    if let Some(cap) = threat.frequency_cap {
        likelihood = likelihood.min(cap);
    }
    Ok(likelihood)
}

/// Raise each misbehaviour to the max of its asserted floor and its causing
/// threats. Returns how many changed.
fn raise_misbehaviours(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<usize> {
    let mut causers: Vec<Level> = vec![ctx.scales.likelihood.lowest(); graph.misbehaviours().len()];
    for threat in graph.threats().iter().filter(|t| !t.skipped) {
        for &m in &threat.effects {
            let slot = &mut causers[m.index()];
            *slot = (*slot).max(threat.likelihood);
        }
    }

    let mut changed = 0;
    for m in graph.misbehaviour_ids().collect::<Vec<_>>() {
        let floor = match graph.misbehaviour(m).twas.map(|x| graph.twas(x)) {
            Some(twas) if twas.asserted_level.is_some() => ctx.scales.likelihood_of(twas.baseline_level)?,
            _ => ctx.scales.likelihood.lowest(),
        };
        let target = floor.max(causers[m.index()]);
        let ms = graph.misbehaviour_mut(m);
        if target > ms.likelihood {
            ms.likelihood = target;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Lower each attribute to the complement of its misbehaviour's likelihood.
fn lower_trustworthiness(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<usize> {
    let mut changed = 0;
    for x in graph.twas_ids().collect::<Vec<_>>() {
        let Some(m) = graph.twas(x).misbehaviour else {
            continue;
        };
        let candidate = ctx.scales.trustworthiness_of(graph.misbehaviour(m).likelihood)?;
        let twas = graph.twas_mut(x);
        if candidate < twas.inferred_level {
            twas.inferred_level = candidate;
            changed += 1;
        }
    }
    Ok(changed)
}
