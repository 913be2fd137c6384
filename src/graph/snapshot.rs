//! Inferred side of the model: every value the engines computed, keyed by URI.

use super::{CausationGraph, NodeRef};
use crate::scale::ScaleSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatState {
    pub uri: String,
    pub likelihood: String,
    pub risk: String,
    pub skipped: bool,
    pub secondary_threat: bool,
    pub initial_cause: bool,
    pub root_cause: bool,
    pub caused_by: Vec<String>,
    pub direct_effects: Vec<String>,
    pub indirect_effects: Vec<String>,
    pub indirect_threats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisbehaviourState {
    pub uri: String,
    pub likelihood: String,
    pub impact: String,
    pub risk: String,
    pub external_cause: bool,
    pub normal_op_effect: bool,
    pub caused_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustworthinessState {
    pub uri: String,
    pub inferred_level: String,
    pub external_cause: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyState {
    pub uri: String,
    pub enabled: bool,
    pub coverage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSnapshot {
    pub threats: Vec<ThreatState>,
    pub misbehaviours: Vec<MisbehaviourState>,
    pub trustworthiness: Vec<TrustworthinessState>,
    pub control_strategies: Vec<StrategyState>,
}

impl CausationGraph {
    fn uris(&self, nodes: impl Iterator<Item = NodeRef>) -> Vec<String> {
        nodes.map(|n| self.node_uri(n).to_string()).collect()
    }

    pub fn inferred_snapshot(&self, scales: &ScaleSet) -> InferredSnapshot {
        InferredSnapshot {
            threats: self
                .threats()
                .iter()
                .map(|t| ThreatState {
                    uri: t.uri.clone(),
                    likelihood: scales.uri(t.likelihood).to_string(),
                    risk: scales.uri(t.risk).to_string(),
                    skipped: t.skipped,
                    secondary_threat: t.flags.secondary_threat,
                    initial_cause: t.flags.initial_cause,
                    root_cause: t.flags.root_cause,
                    caused_by: self.uris(t.caused_by.iter().copied()),
                    direct_effects: self.uris(t.direct_effects.iter().map(|&m| NodeRef::Misbehaviour(m))),
                    indirect_effects: self.uris(t.indirect_effects.iter().map(|&m| NodeRef::Misbehaviour(m))),
                    indirect_threats: self.uris(t.indirect_threats.iter().map(|&i| NodeRef::Threat(i))),
                })
                .collect(),
            misbehaviours: self
                .misbehaviours()
                .iter()
                .map(|m| MisbehaviourState {
                    uri: m.uri.clone(),
                    likelihood: scales.uri(m.likelihood).to_string(),
                    impact: scales.uri(m.impact).to_string(),
                    risk: scales.uri(m.risk).to_string(),
                    external_cause: m.external_cause,
                    normal_op_effect: m.normal_op_effect,
                    caused_by: self.uris(m.caused_by.iter().map(|&t| NodeRef::Threat(t))),
                })
                .collect(),
            trustworthiness: self
                .trustworthiness()
                .iter()
                .map(|t| TrustworthinessState {
                    uri: t.uri.clone(),
                    inferred_level: scales.uri(t.inferred_level).to_string(),
                    external_cause: t.external_cause,
                    caused_by: t.caused_by.map(|m| self.misbehaviour(m).uri.clone()),
                })
                .collect(),
            control_strategies: self
                .strategies()
                .iter()
                .map(|g| StrategyState {
                    uri: g.uri.clone(),
                    enabled: g.enabled,
                    coverage: scales.uri(g.coverage).to_string(),
                })
                .collect(),
        }
    }
}
