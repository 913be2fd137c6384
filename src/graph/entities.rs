//! Entity records. Asserted inputs are set once at construction; fields marked
//! "computed" are owned by the engines and rebuilt from scratch on every run.

use super::ids::{AssetId, CsId, CsgId, MsId, NodeRef, ThreatId, TwasId};
use crate::error::Error;
use crate::scale::Level;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which risk view a run computes. Selects the threats and strategies that apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMode {
    #[default]
    Current,
    Future,
}

impl RiskMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskMode::Current => "current",
            RiskMode::Future => "future",
        }
    }
}

impl FromStr for RiskMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(RiskMode::Current),
            "future" => Ok(RiskMode::Future),
            other => Err(Error::Configuration {
                message: format!("unknown risk mode {:?}", other),
            }),
        }
    }
}

/// Position of an entity within a population triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripletRole<Id> {
    Average { min: Option<Id>, max: Option<Id> },
    Min { avg: Id },
    Max { avg: Id },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRole {
    /// Any member of the population triggers the threat
    Sufficient,
    /// Every member of the population must be in the triggering state
    Necessary,
}

#[derive(Debug, Clone)]
pub struct Asset {
    pub uri: String,
    pub label: String,
    pub population: Option<Level>,
}

/// A declared cause. Causes sharing a role are interchangeable alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialCause<Id> {
    pub id: Id,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreatFlags {
    pub triggered: bool,
    pub secondary_threat: bool,
    pub normal_operation: bool,
    current_risk: bool,
    future_risk: bool,
    /// computed
    pub initial_cause: bool,
    /// computed
    pub root_cause: bool,
}

impl ThreatFlags {
    pub fn new(current_risk: bool, future_risk: bool) -> Self {
        Self {
            current_risk,
            future_risk,
            ..Self::default()
        }
    }

    pub fn current_risk(&self) -> bool {
        self.current_risk
    }

    pub fn future_risk(&self) -> bool {
        self.future_risk
    }

    pub fn set_current_risk(&mut self, value: bool) {
        self.current_risk = value;
    }

    pub fn set_future_risk(&mut self, value: bool) {
        self.future_risk = value;
    }

    pub fn applies_in(&self, mode: RiskMode) -> bool {
        match mode {
            RiskMode::Current => self.current_risk,
            RiskMode::Future => self.future_risk,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Threat {
    pub uri: String,
    pub label: String,
    /// Domain-model threat this instance was generated from
    pub parent: String,
    pub asset: Option<AssetId>,
    /// Potential primary causes
    pub entry_points: Vec<PotentialCause<TwasId>>,
    /// Potential secondary causes
    pub secondary_effect_conditions: Vec<PotentialCause<MsId>>,
    pub effects: Vec<MsId>,
    pub blocked_by: Vec<CsgId>,
    pub mitigated_by: Vec<CsgId>,
    pub triggered_by: Vec<CsgId>,
    pub frequency_cap: Option<Level>,
    pub flags: ThreatFlags,
    pub triplet: Option<TripletRole<ThreatId>>,

    // computed
    pub likelihood: Level,
    pub risk: Level,
    /// Contributed nothing in the last run (mode, trigger, or no causes)
    pub skipped: bool,
    /// Actual causes: potential causes at least as likely as the threat
    pub caused_by: Vec<NodeRef>,
    pub direct_effects: Vec<MsId>,
    pub indirect_effects: Vec<MsId>,
    pub indirect_threats: Vec<ThreatId>,
}

impl Threat {
    pub fn has_declared_causes(&self) -> bool {
        !self.entry_points.is_empty() || !self.secondary_effect_conditions.is_empty()
    }

    /// Every declared cause with its role, primary causes first.
    pub fn potential_causes(&self) -> impl Iterator<Item = (NodeRef, Option<&str>)> + '_ {
        self.entry_points
            .iter()
            .map(|c| (NodeRef::Trustworthiness(c.id), c.role.as_deref()))
            .chain(
                self.secondary_effect_conditions
                    .iter()
                    .map(|c| (NodeRef::Misbehaviour(c.id), c.role.as_deref())),
            )
    }

    /// Strategies whose activation lowers this threat's likelihood.
    pub fn controlling_strategies(&self) -> impl Iterator<Item = CsgId> + '_ {
        self.blocked_by.iter().chain(self.mitigated_by.iter()).copied()
    }
}

#[derive(Debug, Clone)]
pub struct MisbehaviourSet {
    pub uri: String,
    pub label: String,
    pub parent: Option<String>,
    pub asset: AssetId,
    pub asserted_impact: Option<Level>,
    /// The attribute this misbehaviour undermines
    pub twas: Option<TwasId>,
    pub triplet: Option<TripletRole<MsId>>,

    // computed
    pub likelihood: Level,
    pub impact: Level,
    pub risk: Level,
    pub external_cause: bool,
    pub normal_op_effect: bool,
    pub caused_threats: Vec<ThreatId>,
    pub caused_by: Vec<ThreatId>,
}

#[derive(Debug, Clone)]
pub struct TrustworthinessAttributeSet {
    pub uri: String,
    pub label: String,
    pub parent: Option<String>,
    pub asset: AssetId,
    pub asserted_level: Option<Level>,
    /// The misbehaviour that undermines this attribute
    pub misbehaviour: Option<MsId>,
    pub triplet: Option<TripletRole<TwasId>>,

    // computed
    /// Asserted-or-default level after triplet reconciliation
    pub baseline_level: Level,
    pub inferred_level: Level,
    pub external_cause: bool,
    pub caused_threats: Vec<ThreatId>,
    pub caused_by: Option<MsId>,
}

#[derive(Debug, Clone)]
pub struct ControlSet {
    pub uri: String,
    pub label: String,
    pub parent: Option<String>,
    pub asset: AssetId,
    pub active: bool,
    pub coverage: Option<Level>,
    pub triplet: Option<TripletRole<CsId>>,

    // computed
    pub effective_active: bool,
    pub effective_coverage: Level,
}

#[derive(Debug, Clone)]
pub struct ControlStrategy {
    pub uri: String,
    pub label: String,
    pub parent: String,
    pub mandatory: Vec<CsId>,
    pub optional: Vec<CsId>,
    /// Domain-declared ceiling on the strategy's effect
    pub blocking_effect: Option<Level>,
    pub trigger_role: Option<TriggerRole>,
    pub current_risk: bool,
    pub future_risk: bool,
    pub blocks: Vec<ThreatId>,
    pub mitigates: Vec<ThreatId>,
    pub triggers: Vec<ThreatId>,

    // computed
    pub enabled: bool,
    pub coverage: Level,
}

impl ControlStrategy {
    pub fn applies_in(&self, mode: RiskMode) -> bool {
        match mode {
            RiskMode::Current => self.current_risk,
            RiskMode::Future => self.future_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_flag_setters_touch_only_their_own_field() {
        let mut flags = ThreatFlags::new(true, true);
        flags.set_future_risk(false);
        assert!(flags.current_risk());
        assert!(!flags.future_risk());
        assert!(flags.applies_in(RiskMode::Current));
        assert!(!flags.applies_in(RiskMode::Future));

        flags.set_current_risk(false);
        flags.set_future_risk(true);
        assert!(!flags.current_risk());
        assert!(flags.future_risk());
    }
}
