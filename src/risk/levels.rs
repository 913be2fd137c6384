//! Stage 4: misbehaviour and threat risk.

use super::Context;
use crate::error::Result;
use crate::graph::CausationGraph;
use tracing::debug;

/// Misbehaviour risk from the risk table, then threat risk raised along direct
/// effects until nothing changes. Returns the number of threat passes.
pub(crate) fn calculate_risk_levels(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<usize> {
    for m in graph.misbehaviour_ids().collect::<Vec<_>>() {
        let ms = graph.misbehaviour(m);
        let risk = ctx.table.lookup(ms.impact, ms.likelihood)?;
        graph.misbehaviour_mut(m).risk = risk;
    }

    let lowest = ctx.scales.risk.lowest();
    for t in graph.threat_ids().collect::<Vec<_>>() {
        let threat = graph.threat(t);
        let mut risk = lowest;
        if !threat.skipped {
            for &m in &threat.effects {
                risk = risk.max(ctx.table.lookup(graph.misbehaviour(m).impact, threat.likelihood)?);
            }
        }
        graph.threat_mut(t).risk = risk;
    }

    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = 0;
        for t in graph.threat_ids().collect::<Vec<_>>() {
            let threat = graph.threat(t);
            if threat.skipped {
                continue;
            }
            let downstream = threat
                .direct_effects
                .iter()
                .flat_map(|&m| graph.enabled_threats(m))
                .map(|next| graph.threat(next).risk)
                .max();
            if let Some(risk) = downstream.filter(|&r| r > threat.risk) {
                graph.threat_mut(t).risk = risk;
                changed += 1;
            }
        }
        if changed == 0 {
            break;
        }
    }
    debug!(iterations, "threat risk converged");
    Ok(iterations)
}
