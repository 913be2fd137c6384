//! Ordinal scales shared by both engines: likelihood, trustworthiness, impact, risk, population.

mod level;
mod table;

pub use level::{complement, Level, LevelDef, OrdinalScale, ScaleKind};
pub use table::RiskTable;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One level as supplied by the domain model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDocument {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalesDocument {
    pub likelihood: Vec<LevelDocument>,
    pub trustworthiness: Vec<LevelDocument>,
    pub impact: Vec<LevelDocument>,
    pub risk: Vec<LevelDocument>,
    pub population: Vec<LevelDocument>,
}

#[derive(Debug, Clone)]
pub struct ScaleSet {
    pub likelihood: OrdinalScale,
    pub trustworthiness: OrdinalScale,
    pub impact: OrdinalScale,
    pub risk: OrdinalScale,
    pub population: OrdinalScale,
}

impl ScaleSet {
    pub fn from_document(doc: &ScalesDocument) -> Result<Self> {
        let build = |kind: ScaleKind, levels: &[LevelDocument]| {
            OrdinalScale::new(
                kind,
                levels
                    .iter()
                    .map(|l| (l.uri.clone(), l.label.clone(), l.value))
                    .collect(),
            )
        };
        Ok(Self {
            likelihood: build(ScaleKind::Likelihood, &doc.likelihood)?,
            trustworthiness: build(ScaleKind::Trustworthiness, &doc.trustworthiness)?,
            impact: build(ScaleKind::Impact, &doc.impact)?,
            risk: build(ScaleKind::Risk, &doc.risk)?,
            population: build(ScaleKind::Population, &doc.population)?,
        })
    }

    pub fn scale(&self, kind: ScaleKind) -> &OrdinalScale {
        match kind {
            ScaleKind::Likelihood => &self.likelihood,
            ScaleKind::Trustworthiness => &self.trustworthiness,
            ScaleKind::Impact => &self.impact,
            ScaleKind::Risk => &self.risk,
            ScaleKind::Population => &self.population,
        }
    }

    /// Complement of `level` on the `to` scale; fails if the scale sizes differ.
    pub fn complement(&self, level: Level, to: ScaleKind) -> Result<Level> {
        complement(level, self.scale(level.scale), self.scale(to))
    }

    /// Likelihood that an attribute at trust level `tw` is undermined.
    pub fn likelihood_of(&self, tw: Level) -> Result<Level> {
        self.complement(tw, ScaleKind::Likelihood)
    }

    /// Trust level left once a misbehaviour has likelihood `lh`.
    pub fn trustworthiness_of(&self, lh: Level) -> Result<Level> {
        self.complement(lh, ScaleKind::Trustworthiness)
    }

    pub fn uri(&self, level: Level) -> &str {
        self.scale(level.scale).uri(level)
    }

    pub fn label(&self, level: Level) -> &str {
        self.scale(level.scale).label(level)
    }
}
