//! Document -> arena. Resolves every URI once; any dangling reference aborts.

use super::document::{CauseDocument, GraphDocument, ModelDocument, TripletDocument};
use super::entities::*;
use super::ids::*;
use super::triplet;
use super::CausationGraph;
use crate::error::{Error, Result};
use crate::scale::{Level, OrdinalScale, ScaleSet};
use std::collections::HashMap;

struct Resolver<'a> {
    index: HashMap<String, EntityRef>,
    scales: &'a ScaleSet,
}

impl<'a> Resolver<'a> {
    fn register(&mut self, uri: &str, entity: EntityRef) -> Result<()> {
        if self.index.insert(uri.to_string(), entity).is_some() {
            return Err(Error::DuplicateUri {
                uri: uri.to_string(),
            });
        }
        Ok(())
    }

    fn resolve<T>(
        &self,
        kind: &'static str,
        owner: &str,
        target: &str,
        expected: &'static str,
        pick: impl Fn(EntityRef) -> Option<T>,
    ) -> Result<T> {
        self.index
            .get(target)
            .copied()
            .and_then(pick)
            .ok_or_else(|| Error::MissingReference {
                kind,
                uri: owner.to_string(),
                expected,
                target: target.to_string(),
            })
    }

    fn asset(&self, kind: &'static str, owner: &str, target: &str) -> Result<AssetId> {
        self.resolve(kind, owner, target, "asset", |e| match e {
            EntityRef::Asset(id) => Some(id),
            _ => None,
        })
    }

    fn ms(&self, kind: &'static str, owner: &str, target: &str) -> Result<MsId> {
        self.resolve(kind, owner, target, "misbehaviour set", |e| match e {
            EntityRef::Node(NodeRef::Misbehaviour(id)) => Some(id),
            _ => None,
        })
    }

    fn twas(&self, kind: &'static str, owner: &str, target: &str) -> Result<TwasId> {
        self.resolve(kind, owner, target, "trustworthiness attribute set", |e| match e {
            EntityRef::Node(NodeRef::Trustworthiness(id)) => Some(id),
            _ => None,
        })
    }

    fn cs(&self, kind: &'static str, owner: &str, target: &str) -> Result<CsId> {
        self.resolve(kind, owner, target, "control set", |e| match e {
            EntityRef::Control(id) => Some(id),
            _ => None,
        })
    }

    fn csg(&self, kind: &'static str, owner: &str, target: &str) -> Result<CsgId> {
        self.resolve(kind, owner, target, "control strategy", |e| match e {
            EntityRef::Strategy(id) => Some(id),
            _ => None,
        })
    }

    fn level(scale: &OrdinalScale, uri: &Option<String>) -> Result<Option<Level>> {
        uri.as_deref().map(|u| scale.level_by_uri(u)).transpose()
    }

    fn all<T>(
        &self,
        uris: &[String],
        one: impl Fn(&Self, &str) -> Result<T>,
    ) -> Result<Vec<T>> {
        uris.iter().map(|u| one(self, u)).collect()
    }
}

fn triplets<'d, Id: Copy>(
    members: impl Iterator<Item = (&'d str, &'d TripletDocument)>,
    make: impl Fn(usize) -> Id,
) -> Result<Vec<Option<TripletRole<Id>>>> {
    let members: Vec<_> = members.collect();
    triplet::resolve(&members, make)
}

fn causes<Id>(
    docs: &[CauseDocument],
    one: impl Fn(&str) -> Result<Id>,
) -> Result<Vec<PotentialCause<Id>>> {
    docs.iter()
        .map(|c| {
            Ok(PotentialCause {
                id: one(c.uri())?,
                role: c.role().map(String::from),
            })
        })
        .collect()
}

impl ModelDocument {
    /// Validate the scales and resolve the graph against them.
    pub fn build(&self) -> Result<(ScaleSet, CausationGraph)> {
        let scales = ScaleSet::from_document(&self.scales)?;
        let graph = CausationGraph::from_document(&self.graph, &scales)?;
        Ok((scales, graph))
    }
}

impl CausationGraph {
    pub fn from_document(doc: &GraphDocument, scales: &ScaleSet) -> Result<Self> {
        let mut r = Resolver {
            index: HashMap::new(),
            scales,
        };
        for (i, a) in doc.assets.iter().enumerate() {
            r.register(&a.uri, EntityRef::Asset(AssetId::new(i)))?;
        }
        for (i, t) in doc.threats.iter().enumerate() {
            r.register(&t.uri, EntityRef::Node(NodeRef::Threat(ThreatId::new(i))))?;
        }
        for (i, m) in doc.misbehaviours.iter().enumerate() {
            r.register(&m.uri, EntityRef::Node(NodeRef::Misbehaviour(MsId::new(i))))?;
        }
        for (i, t) in doc.trustworthiness.iter().enumerate() {
            r.register(&t.uri, EntityRef::Node(NodeRef::Trustworthiness(TwasId::new(i))))?;
        }
        for (i, c) in doc.controls.iter().enumerate() {
            r.register(&c.uri, EntityRef::Control(CsId::new(i)))?;
        }
        for (i, g) in doc.control_strategies.iter().enumerate() {
            r.register(&g.uri, EntityRef::Strategy(CsgId::new(i)))?;
        }

        let lowest_lh = scales.likelihood.lowest();
        let top_tw = scales.trustworthiness.highest();
        let lowest_impact = scales.impact.lowest();
        let lowest_risk = scales.risk.lowest();

        let assets = doc
            .assets
            .iter()
            .map(|a| {
                Ok(Asset {
                    uri: a.uri.clone(),
                    label: a.label.clone(),
                    population: Resolver::level(&scales.population, &a.population)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ms_triplets = triplets(
            doc.misbehaviours.iter().map(|m| (m.uri.as_str(), &m.triplet)),
            MsId::new,
        )?;
        let mut misbehaviours = doc
            .misbehaviours
            .iter()
            .zip(ms_triplets)
            .map(|(m, triplet)| {
                const KIND: &str = "misbehaviour set";
                let asserted_impact = Resolver::level(&scales.impact, &m.impact)?;
                Ok(MisbehaviourSet {
                    uri: m.uri.clone(),
                    label: m.label.clone(),
                    parent: m.parent.clone(),
                    asset: r.asset(KIND, &m.uri, &m.asset)?,
                    asserted_impact,
                    twas: None,
                    triplet,
                    likelihood: lowest_lh,
                    impact: asserted_impact.unwrap_or(lowest_impact),
                    risk: lowest_risk,
                    external_cause: false,
                    normal_op_effect: false,
                    caused_threats: Vec::new(),
                    caused_by: Vec::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let twas_triplets = triplets(
            doc.trustworthiness.iter().map(|t| (t.uri.as_str(), &t.triplet)),
            TwasId::new,
        )?;
        let mut twas = Vec::with_capacity(doc.trustworthiness.len());
        for (i, (t, triplet)) in doc.trustworthiness.iter().zip(twas_triplets).enumerate() {
            const KIND: &str = "trustworthiness attribute set";
            let misbehaviour = t
                .misbehaviour
                .as_deref()
                .map(|u| r.ms(KIND, &t.uri, u))
                .transpose()?;
            if let Some(ms) = misbehaviour {
                let slot = &mut misbehaviours[ms.index()].twas;
                if let Some(other) = slot {
                    return Err(Error::Configuration {
                        message: format!(
                            "misbehaviour {} undermines both {} and {}",
                            doc.misbehaviours[ms.index()].uri,
                            doc.trustworthiness[other.index()].uri,
                            t.uri
                        ),
                    });
                }
                *slot = Some(TwasId::new(i));
            }
            let asserted_level = Resolver::level(&scales.trustworthiness, &t.asserted)?;
            twas.push(TrustworthinessAttributeSet {
                uri: t.uri.clone(),
                label: t.label.clone(),
                parent: t.parent.clone(),
                asset: r.asset(KIND, &t.uri, &t.asset)?,
                asserted_level,
                misbehaviour,
                triplet,
                baseline_level: asserted_level.unwrap_or(top_tw),
                inferred_level: asserted_level.unwrap_or(top_tw),
                external_cause: false,
                caused_threats: Vec::new(),
                caused_by: None,
            });
        }

        let cs_triplets = triplets(
            doc.controls.iter().map(|c| (c.uri.as_str(), &c.triplet)),
            CsId::new,
        )?;
        let controls = doc
            .controls
            .iter()
            .zip(cs_triplets)
            .map(|(c, triplet)| {
                let coverage = Resolver::level(&scales.trustworthiness, &c.coverage)?;
                let active = c.active.unwrap_or(false);
                Ok(ControlSet {
                    uri: c.uri.clone(),
                    label: c.label.clone(),
                    parent: c.parent.clone(),
                    asset: r.asset("control set", &c.uri, &c.asset)?,
                    active,
                    coverage,
                    triplet,
                    effective_active: active,
                    effective_coverage: coverage.unwrap_or(top_tw),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut strategies = doc
            .control_strategies
            .iter()
            .map(|g| {
                const KIND: &str = "control strategy";
                let parent = g.parent.clone().ok_or_else(|| Error::MissingParent {
                    kind: KIND,
                    uri: g.uri.clone(),
                })?;
                Ok(ControlStrategy {
                    uri: g.uri.clone(),
                    label: g.label.clone(),
                    parent,
                    mandatory: r.all(&g.mandatory, |r, u| r.cs(KIND, &g.uri, u))?,
                    optional: r.all(&g.optional, |r, u| r.cs(KIND, &g.uri, u))?,
                    blocking_effect: Resolver::level(&scales.trustworthiness, &g.blocking_effect)?,
                    trigger_role: g.trigger_role,
                    current_risk: g.current_risk.unwrap_or(true),
                    future_risk: g.future_risk.unwrap_or(true),
                    blocks: Vec::new(),
                    mitigates: Vec::new(),
                    triggers: Vec::new(),
                    enabled: false,
                    coverage: scales.trustworthiness.lowest(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let threat_triplets = triplets(
            doc.threats.iter().map(|t| (t.uri.as_str(), &t.triplet)),
            ThreatId::new,
        )?;
        let mut threats = Vec::with_capacity(doc.threats.len());
        for (i, (t, triplet)) in doc.threats.iter().zip(threat_triplets).enumerate() {
            const KIND: &str = "threat";
            let id = ThreatId::new(i);
            let parent = t.parent.clone().ok_or_else(|| Error::MissingParent {
                kind: KIND,
                uri: t.uri.clone(),
            })?;
            let entry_points = causes(&t.entry_points, |u| r.twas(KIND, &t.uri, u))?;
            let secondary_effect_conditions =
                causes(&t.secondary_effect_conditions, |u| r.ms(KIND, &t.uri, u))?;

            let blocked_by = r.all(&t.blocked_by, |r, u| r.csg(KIND, &t.uri, u))?;
            let mitigated_by = r.all(&t.mitigated_by, |r, u| r.csg(KIND, &t.uri, u))?;
            let triggered_by = r.all(&t.triggered_by, |r, u| r.csg(KIND, &t.uri, u))?;
            for g in &blocked_by {
                strategies[g.index()].blocks.push(id);
            }
            for g in &mitigated_by {
                strategies[g.index()].mitigates.push(id);
            }
            for g in &triggered_by {
                strategies[g.index()].triggers.push(id);
            }

            let mut flags = ThreatFlags::new(
                t.current_risk.unwrap_or(true),
                t.future_risk.unwrap_or(true),
            );
            flags.triggered = t.triggered.unwrap_or(false);
            flags.normal_operation = t.normal_operation.unwrap_or(false);
            flags.secondary_threat = t
                .secondary_threat
                .unwrap_or(entry_points.is_empty() && !secondary_effect_conditions.is_empty());

            threats.push(Threat {
                uri: t.uri.clone(),
                label: t.label.clone(),
                parent,
                asset: t
                    .asset
                    .as_deref()
                    .map(|u| r.asset(KIND, &t.uri, u))
                    .transpose()?,
                entry_points,
                secondary_effect_conditions,
                effects: r.all(&t.effects, |r, u| r.ms(KIND, &t.uri, u))?,
                blocked_by,
                mitigated_by,
                triggered_by,
                frequency_cap: Resolver::level(&r.scales.likelihood, &t.frequency)?,
                flags,
                triplet,
                likelihood: lowest_lh,
                risk: lowest_risk,
                skipped: false,
                caused_by: Vec::new(),
                direct_effects: Vec::new(),
                indirect_effects: Vec::new(),
                indirect_threats: Vec::new(),
            });
        }

        Ok(Self {
            assets,
            threats,
            misbehaviours,
            twas,
            controls,
            strategies,
            index: r.index,
        })
    }
}
