//! Runs the propagation stages and summarises the outcome.

use super::causation::calculate_causation_links;
use super::initialise::initialise;
use super::levels::calculate_risk_levels;
use super::likelihood::calculate_threat_likelihood;
use super::paths::{calculate_attack_paths, calculate_normal_operation_paths};
use super::Context;
use crate::config::RiskConfig;
use crate::error::Result;
use crate::graph::{CausationGraph, RiskMode};
use crate::scale::{Level, RiskTable, ScaleSet};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

/// Outcome of one propagation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResult {
    pub run_id: String,
    pub mode: RiskMode,
    /// Highest misbehaviour risk in the system
    pub overall_risk: Level,
    pub likelihood_iterations: usize,
    pub risk_iterations: usize,
    pub threats_evaluated: usize,
    pub threats_skipped: usize,
    pub initial_causes: usize,
    pub root_causes: usize,
    pub ts: i64,
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Propagate in the configured mode.
    pub fn run(&self, graph: &mut CausationGraph, scales: &ScaleSet) -> Result<RiskResult> {
        self.propagate(graph, scales, self.config.mode)
    }

    /// Recompute every inferred value of `graph` from its asserted inputs.
    ///
    /// Works on a copy; on error `graph` is left exactly as it was.
    pub fn propagate(&self, graph: &mut CausationGraph, scales: &ScaleSet, mode: RiskMode) -> Result<RiskResult> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("propagate", run_id = %run_id, mode = mode.as_str());
        let _guard = span.enter();

        let table = RiskTable::for_scales(scales)?;
        let mut work = graph.clone();
        let suppression = initialise(&mut work, scales, mode)?;
        let ctx = Context {
            scales,
            mode,
            table,
            suppression,
        };

        let likelihood_iterations = calculate_threat_likelihood(&mut work, &ctx)?;
        calculate_causation_links(&mut work, &ctx)?;
        let risk_iterations = calculate_risk_levels(&mut work, &ctx)?;
        let initial_causes = calculate_normal_operation_paths(&mut work);
        let root_causes = calculate_attack_paths(&mut work);

        let overall_risk = work
            .misbehaviours()
            .iter()
            .map(|m| m.risk)
            .max()
            .unwrap_or_else(|| scales.risk.lowest());
        let threats_skipped = work.threats().iter().filter(|t| t.skipped).count();
        let result = RiskResult {
            run_id,
            mode,
            overall_risk,
            likelihood_iterations,
            risk_iterations,
            threats_evaluated: work.threats().len() - threats_skipped,
            threats_skipped,
            initial_causes,
            root_causes,
            ts: chrono::Utc::now().timestamp_millis(),
        };
        *graph = work;

        info!(
            overall_risk = scales.uri(overall_risk),
            threats = result.threats_evaluated,
            skipped = result.threats_skipped,
            root_causes,
            initial_causes,
            "risk propagation complete"
        );
        Ok(result)
    }
}
