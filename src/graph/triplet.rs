//! Population triplets: min/avg/max variants of one entity.
//!
//! The average member carries the user's assertion. Whenever min or max disagree
//! with it the extreme is moved onto the average.

use super::document::TripletDocument;
use super::entities::{TriggerRole, TripletRole};
use super::ids::CsId;
use super::CausationGraph;
use crate::error::{Error, Result};
use crate::scale::Level;
use std::collections::HashMap;

/// Resolve and cross-check triplet back-references among entities of one kind.
pub(crate) fn resolve<Id: Copy>(
    members: &[(&str, &TripletDocument)],
    make: impl Fn(usize) -> Id,
) -> Result<Vec<Option<TripletRole<Id>>>> {
    let position: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(i, (uri, _))| (*uri, i))
        .collect();
    let invalid = |uri: &str, message: String| Error::InvalidTriplet {
        uri: uri.to_string(),
        message,
    };
    let find = |owner: &str, target: &str| {
        position
            .get(target)
            .copied()
            .ok_or_else(|| Error::MissingReference {
                kind: "triplet member",
                uri: owner.to_string(),
                expected: "triplet member of the same kind",
                target: target.to_string(),
            })
    };

    let mut roles = Vec::with_capacity(members.len());
    for &(uri, t) in members {
        let role = match (&t.min_of, &t.max_of) {
            (Some(_), Some(_)) => {
                return Err(invalid(uri, "both minOf and maxOf are set".into()));
            }
            (Some(avg), None) | (None, Some(avg)) => {
                if t.has_min.is_some() || t.has_max.is_some() {
                    return Err(invalid(uri, "an extreme member cannot have hasMin/hasMax".into()));
                }
                let j = find(uri, avg.as_str())?;
                let back = if t.min_of.is_some() {
                    &members[j].1.has_min
                } else {
                    &members[j].1.has_max
                };
                if back.as_deref() != Some(uri) {
                    return Err(invalid(uri, format!("{} does not point back", avg)));
                }
                if t.min_of.is_some() {
                    Some(TripletRole::Min { avg: make(j) })
                } else {
                    Some(TripletRole::Max { avg: make(j) })
                }
            }
            (None, None) if t.has_min.is_some() || t.has_max.is_some() => {
                let extreme = |target: &Option<String>, is_min: bool| -> Result<Option<Id>> {
                    let Some(target) = target else {
                        return Ok(None);
                    };
                    let k = find(uri, target.as_str())?;
                    let back = if is_min {
                        &members[k].1.min_of
                    } else {
                        &members[k].1.max_of
                    };
                    if back.as_deref() != Some(uri) {
                        return Err(invalid(uri, format!("{} does not point back", target)));
                    }
                    Ok(Some(make(k)))
                };
                let min = extreme(&t.has_min, true)?;
                let max = extreme(&t.has_max, false)?;
                Some(TripletRole::Average { min, max })
            }
            (None, None) => None,
        };
        roles.push(role);
    }
    Ok(roles)
}

/// Outcome of forcing `min <= avg <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reconciled {
    pub min: Option<Level>,
    pub max: Option<Level>,
    pub adjusted: bool,
}

pub(crate) fn reconcile_levels(min: Option<Level>, avg: Level, max: Option<Level>) -> Reconciled {
    let mut adjusted = false;
    let min = min.map(|m| {
        if m > avg {
            adjusted = true;
            avg
        } else {
            m
        }
    });
    let max = max.map(|m| {
        if m < avg {
            adjusted = true;
            avg
        } else {
            m
        }
    });
    Reconciled { min, max, adjusted }
}

/// Force `min.active => avg.active => max.active`. Returns (min, max, adjusted).
pub(crate) fn reconcile_activation(
    min: Option<bool>,
    avg: bool,
    max: Option<bool>,
) -> (Option<bool>, Option<bool>, bool) {
    let new_min = min.map(|m| m && avg);
    let new_max = max.map(|m| m || avg);
    let adjusted = new_min != min || new_max != max;
    (new_min, new_max, adjusted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extreme {
    Min,
    Max,
}

/// Which triplet member a triggering strategy consults for one of its control sets.
///
/// Mandatory controls follow the trigger role (sufficient: max, necessary: min);
/// optional, suppressing controls take the opposite extreme.
pub(crate) fn trigger_extreme(role: TriggerRole, mandatory: bool) -> Extreme {
    match (role, mandatory) {
        (TriggerRole::Sufficient, true) => Extreme::Max,
        (TriggerRole::Necessary, true) => Extreme::Min,
        (TriggerRole::Sufficient, false) => Extreme::Min,
        (TriggerRole::Necessary, false) => Extreme::Max,
    }
}

impl CausationGraph {
    /// The requested extreme of the triplet `cs` belongs to, or `cs` itself when
    /// it has no triplet or the triplet lacks that member.
    pub(crate) fn control_member(&self, cs: CsId, extreme: Extreme) -> CsId {
        let avg = match self.control(cs).triplet {
            None => return cs,
            Some(TripletRole::Min { avg }) | Some(TripletRole::Max { avg }) => avg,
            Some(TripletRole::Average { .. }) => cs,
        };
        match (self.control(avg).triplet, extreme) {
            (Some(TripletRole::Average { min: Some(m), .. }), Extreme::Min) => m,
            (Some(TripletRole::Average { max: Some(m), .. }), Extreme::Max) => m,
            _ => cs,
        }
    }
}
