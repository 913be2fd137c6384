//! Stage 3: actual causes, direct effects and external causes.
//!
//! A potential cause is an actual cause when it is at least as likely as the
//! threat it enables; a misbehaviour is a direct effect when the threat alone
//! explains its likelihood.

use super::likelihood::effective_cause_likelihood;
use super::Context;
use crate::error::Result;
use crate::graph::{CausationGraph, NodeRef};
use tracing::debug;

pub(crate) fn calculate_causation_links(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<()> {
    mark_external_causes(graph, ctx)?;

    let mut links = 0usize;
    for t in graph.threat_ids().collect::<Vec<_>>() {
        let threat = graph.threat(t);
        if threat.skipped {
            continue;
        }
        let likelihood = threat.likelihood;
        let mut causes = Vec::new();
        for (cause, _) in threat.potential_causes() {
            if effective_cause_likelihood(graph, ctx, t, cause)? >= likelihood && !causes.contains(&cause) {
                causes.push(cause);
            }
        }
        let effects: Vec<_> = threat
            .effects
            .iter()
            .copied()
            .filter(|&m| graph.misbehaviour(m).likelihood == likelihood)
            .collect();

        for &cause in &causes {
            match cause {
                NodeRef::Misbehaviour(m) => graph.misbehaviour_mut(m).caused_threats.push(t),
                NodeRef::Trustworthiness(x) => graph.twas_mut(x).caused_threats.push(t),
                NodeRef::Threat(_) => {}
            }
        }
        for &m in &effects {
            graph.misbehaviour_mut(m).caused_by.push(t);
        }
        links += causes.len() + effects.len();
        let threat = graph.threat_mut(t);
        threat.caused_by = causes;
        threat.direct_effects = effects;
    }
    debug!(links, "causation links recorded");
    Ok(())
}

/// An attribute held down only by its assertion, and a misbehaviour whose
/// likelihood comes only from such an attribute, are external causes.
fn mark_external_causes(graph: &mut CausationGraph, ctx: &Context<'_>) -> Result<()> {
    let top = ctx.scales.trustworthiness.highest();
    for x in graph.twas_ids().collect::<Vec<_>>() {
        let twas = graph.twas_mut(x);
        twas.external_cause = twas.asserted_level.is_some()
            && twas.inferred_level == twas.baseline_level
            && twas.baseline_level < top;
        twas.caused_by = match twas.misbehaviour {
            Some(m) if twas.inferred_level < twas.baseline_level => Some(m),
            _ => None,
        };
    }
    for m in graph.misbehaviour_ids().collect::<Vec<_>>() {
        let external = match graph.misbehaviour(m).twas.map(|x| graph.twas(x)) {
            Some(twas) if twas.external_cause => {
                graph.misbehaviour(m).likelihood == ctx.scales.likelihood_of(twas.baseline_level)?
            }
            _ => false,
        };
        graph.misbehaviour_mut(m).external_cause = external;
    }
    Ok(())
}
