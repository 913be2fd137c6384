//! JSON interchange format produced by the model construction step.
//!
//! Booleans stay `Option<bool>` here and are resolved to concrete values exactly once,
//! when the document is turned into a [`CausationGraph`](super::CausationGraph).

use super::entities::TriggerRole;
use crate::error::Result;
use crate::scale::ScalesDocument;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Population triplet back-references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripletDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_max: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub population: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CauseDocument {
    Uri(String),
    WithRole { uri: String, role: String },
}

impl CauseDocument {
    pub fn uri(&self) -> &str {
        match self {
            CauseDocument::Uri(uri) | CauseDocument::WithRole { uri, .. } => uri,
        }
    }

    pub fn role(&self) -> Option<&str> {
        match self {
            CauseDocument::Uri(_) => None,
            CauseDocument::WithRole { role, .. } => Some(role),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub entry_points: Vec<CauseDocument>,
    #[serde(default)]
    pub secondary_effect_conditions: Vec<CauseDocument>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub mitigated_by: Vec<String>,
    #[serde(default)]
    pub triggered_by: Vec<String>,
    /// Likelihood cap
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub triggered: Option<bool>,
    #[serde(default)]
    pub secondary_threat: Option<bool>,
    #[serde(default)]
    pub normal_operation: Option<bool>,
    #[serde(default)]
    pub current_risk: Option<bool>,
    #[serde(default)]
    pub future_risk: Option<bool>,
    #[serde(flatten)]
    pub triplet: TripletDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisbehaviourDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub asset: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(flatten)]
    pub triplet: TripletDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustworthinessDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub asset: String,
    #[serde(default)]
    pub asserted: Option<String>,
    /// Misbehaviour that undermines this attribute
    #[serde(default)]
    pub misbehaviour: Option<String>,
    #[serde(flatten)]
    pub triplet: TripletDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSetDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub asset: String,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub coverage: Option<String>,
    #[serde(flatten)]
    pub triplet: TripletDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlStrategyDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub mandatory: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default)]
    pub blocking_effect: Option<String>,
    #[serde(default)]
    pub trigger_role: Option<TriggerRole>,
    #[serde(default)]
    pub current_risk: Option<bool>,
    #[serde(default)]
    pub future_risk: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub assets: Vec<AssetDocument>,
    #[serde(default)]
    pub threats: Vec<ThreatDocument>,
    #[serde(default)]
    pub misbehaviours: Vec<MisbehaviourDocument>,
    #[serde(default)]
    pub trustworthiness: Vec<TrustworthinessDocument>,
    #[serde(default)]
    pub controls: Vec<ControlSetDocument>,
    #[serde(default)]
    pub control_strategies: Vec<ControlStrategyDocument>,
}

/// Everything a run consumes: the domain scales and the system-model graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    pub scales: ScalesDocument,
    pub graph: GraphDocument,
}

impl ModelDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// SHA-256 over the canonical JSON encoding of the asserted model.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        let mut h = Sha256::new();
        h.update(&bytes);
        Ok(format!("{:x}", h.finalize()))
    }
}
