//! Causation graph: threats, misbehaviour sets, trustworthiness attribute sets,
//! control sets and control strategies held in per-kind arenas and linked by index.
//!
//! Cycles are ordinary here: a misbehaviour may enable a threat that (through other
//! threats) causes the same misbehaviour again. Both engines are written to cope.

mod build;
pub mod document;
mod entities;
mod ids;
mod snapshot;
pub(crate) mod triplet;

pub use document::{
    AssetDocument, CauseDocument, ControlSetDocument, ControlStrategyDocument, GraphDocument,
    MisbehaviourDocument, ModelDocument, ThreatDocument, TripletDocument,
    TrustworthinessDocument,
};
pub use entities::{
    Asset, ControlSet, ControlStrategy, MisbehaviourSet, PotentialCause, RiskMode, Threat,
    ThreatFlags, TriggerRole, TripletRole, TrustworthinessAttributeSet,
};
pub use ids::{AssetId, CsId, CsgId, EntityRef, MsId, NodeRef, ThreatId, TwasId};
pub use snapshot::{
    InferredSnapshot, MisbehaviourState, StrategyState, ThreatState, TrustworthinessState,
};

use crate::error::{Error, Result};
use crate::scale::{Level, ScaleSet};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct CausationGraph {
    assets: Vec<Asset>,
    threats: Vec<Threat>,
    misbehaviours: Vec<MisbehaviourSet>,
    twas: Vec<TrustworthinessAttributeSet>,
    controls: Vec<ControlSet>,
    strategies: Vec<ControlStrategy>,
    index: HashMap<String, EntityRef>,
}

impl CausationGraph {
    pub fn lookup(&self, uri: &str) -> Option<EntityRef> {
        self.index.get(uri).copied()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn threats(&self) -> &[Threat] {
        &self.threats
    }

    pub fn misbehaviours(&self) -> &[MisbehaviourSet] {
        &self.misbehaviours
    }

    pub fn trustworthiness(&self) -> &[TrustworthinessAttributeSet] {
        &self.twas
    }

    pub fn controls(&self) -> &[ControlSet] {
        &self.controls
    }

    pub fn strategies(&self) -> &[ControlStrategy] {
        &self.strategies
    }

    pub fn threat_ids(&self) -> impl Iterator<Item = ThreatId> {
        (0..self.threats.len()).map(ThreatId::new)
    }

    pub fn misbehaviour_ids(&self) -> impl Iterator<Item = MsId> {
        (0..self.misbehaviours.len()).map(MsId::new)
    }

    pub fn twas_ids(&self) -> impl Iterator<Item = TwasId> {
        (0..self.twas.len()).map(TwasId::new)
    }

    pub fn strategy_ids(&self) -> impl Iterator<Item = CsgId> {
        (0..self.strategies.len()).map(CsgId::new)
    }

    pub fn threat(&self, id: ThreatId) -> &Threat {
        &self.threats[id.index()]
    }

    pub fn misbehaviour(&self, id: MsId) -> &MisbehaviourSet {
        &self.misbehaviours[id.index()]
    }

    pub fn twas(&self, id: TwasId) -> &TrustworthinessAttributeSet {
        &self.twas[id.index()]
    }

    pub fn control(&self, id: CsId) -> &ControlSet {
        &self.controls[id.index()]
    }

    pub fn strategy(&self, id: CsgId) -> &ControlStrategy {
        &self.strategies[id.index()]
    }

    pub(crate) fn threat_mut(&mut self, id: ThreatId) -> &mut Threat {
        &mut self.threats[id.index()]
    }

    pub(crate) fn misbehaviour_mut(&mut self, id: MsId) -> &mut MisbehaviourSet {
        &mut self.misbehaviours[id.index()]
    }

    pub(crate) fn twas_mut(&mut self, id: TwasId) -> &mut TrustworthinessAttributeSet {
        &mut self.twas[id.index()]
    }

    pub(crate) fn control_mut(&mut self, id: CsId) -> &mut ControlSet {
        &mut self.controls[id.index()]
    }

    pub(crate) fn strategy_mut(&mut self, id: CsgId) -> &mut ControlStrategy {
        &mut self.strategies[id.index()]
    }

    pub fn threat_by_uri(&self, uri: &str) -> Option<&Threat> {
        match self.lookup(uri)? {
            EntityRef::Node(NodeRef::Threat(id)) => Some(self.threat(id)),
            _ => None,
        }
    }

    pub fn misbehaviour_by_uri(&self, uri: &str) -> Option<&MisbehaviourSet> {
        match self.lookup(uri)? {
            EntityRef::Node(NodeRef::Misbehaviour(id)) => Some(self.misbehaviour(id)),
            _ => None,
        }
    }

    pub fn twas_by_uri(&self, uri: &str) -> Option<&TrustworthinessAttributeSet> {
        match self.lookup(uri)? {
            EntityRef::Node(NodeRef::Trustworthiness(id)) => Some(self.twas(id)),
            _ => None,
        }
    }

    pub fn strategy_by_uri(&self, uri: &str) -> Option<&ControlStrategy> {
        match self.lookup(uri)? {
            EntityRef::Strategy(id) => Some(self.strategy(id)),
            _ => None,
        }
    }

    pub fn node_uri(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Threat(id) => &self.threat(id).uri,
            NodeRef::Misbehaviour(id) => &self.misbehaviour(id).uri,
            NodeRef::Trustworthiness(id) => &self.twas(id).uri,
        }
    }

    pub fn node_label(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Threat(id) => &self.threat(id).label,
            NodeRef::Misbehaviour(id) => &self.misbehaviour(id).label,
            NodeRef::Trustworthiness(id) => &self.twas(id).label,
        }
    }

    pub fn node_asset(&self, node: NodeRef) -> Option<AssetId> {
        match node {
            NodeRef::Threat(id) => self.threat(id).asset,
            NodeRef::Misbehaviour(id) => Some(self.misbehaviour(id).asset),
            NodeRef::Trustworthiness(id) => Some(self.twas(id).asset),
        }
    }

    /// Actual causes of a node as recorded by the last propagation.
    pub fn node_causes(&self, node: NodeRef) -> Vec<NodeRef> {
        match node {
            NodeRef::Threat(id) => self.threat(id).caused_by.clone(),
            NodeRef::Misbehaviour(id) => self
                .misbehaviour(id)
                .caused_by
                .iter()
                .map(|&t| NodeRef::Threat(t))
                .collect(),
            NodeRef::Trustworthiness(id) => self
                .twas(id)
                .caused_by
                .map(NodeRef::Misbehaviour)
                .into_iter()
                .collect(),
        }
    }

    /// Threats a misbehaviour actually enables, directly or through the
    /// attribute it has lowered.
    pub fn enabled_threats(&self, m: MsId) -> impl Iterator<Item = ThreatId> + '_ {
        let ms = self.misbehaviour(m);
        let via_twas = ms
            .twas
            .map(|x| self.twas(x))
            .filter(|twas| twas.caused_by == Some(m))
            .map(|twas| twas.caused_threats.as_slice())
            .unwrap_or(&[]);
        ms.caused_threats.iter().chain(via_twas.iter()).copied()
    }

    /// Whether a node belongs to ordinary system behaviour rather than an attack.
    pub fn is_normal_op(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Threat(id) => self.threat(id).flags.normal_operation,
            NodeRef::Misbehaviour(id) => self.misbehaviour(id).normal_op_effect,
            NodeRef::Trustworthiness(id) => self
                .twas(id)
                .caused_by
                .map(|ms| self.misbehaviour(ms).normal_op_effect)
                .unwrap_or(false),
        }
    }

    /// Whether a node's level is asserted rather than threat-caused.
    pub fn is_external_cause(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Threat(_) => false,
            NodeRef::Misbehaviour(id) => self.misbehaviour(id).external_cause,
            NodeRef::Trustworthiness(id) => self.twas(id).external_cause,
        }
    }

    /// Likelihood a node represents: threat or misbehaviour likelihood directly,
    /// trustworthiness attributes through the complement of their inferred level.
    pub fn node_likelihood(&self, node: NodeRef, scales: &ScaleSet) -> Result<Level> {
        match node {
            NodeRef::Threat(id) => Ok(self.threat(id).likelihood),
            NodeRef::Misbehaviour(id) => Ok(self.misbehaviour(id).likelihood),
            NodeRef::Trustworthiness(id) => scales.likelihood_of(self.twas(id).inferred_level),
        }
    }

    /// Activate or deactivate a control set; takes effect on the next propagation.
    pub fn set_control_active(&mut self, uri: &str, active: bool) -> Result<()> {
        match self.lookup(uri) {
            Some(EntityRef::Control(id)) => {
                self.control_mut(id).active = active;
                Ok(())
            }
            _ => Err(Error::MissingReference {
                kind: "request",
                uri: uri.to_string(),
                expected: "control set",
                target: uri.to_string(),
            }),
        }
    }

    /// Replace the asserted level of a trustworthiness attribute set. The level
    /// must come from the trustworthiness scale of `scales`.
    pub fn set_asserted_level(&mut self, scales: &ScaleSet, uri: &str, level: Option<Level>) -> Result<()> {
        let level = level.map(|l| scales.trustworthiness.check(l)).transpose()?;
        match self.lookup(uri) {
            Some(EntityRef::Node(NodeRef::Trustworthiness(id))) => {
                self.twas_mut(id).asserted_level = level;
                Ok(())
            }
            _ => Err(Error::MissingReference {
                kind: "request",
                uri: uri.to_string(),
                expected: "trustworthiness attribute set",
                target: uri.to_string(),
            }),
        }
    }
}
