//! Ordinal levels and the finite, totally ordered scales they belong to.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Likelihood,
    Trustworthiness,
    Impact,
    Risk,
    Population,
}

impl ScaleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleKind::Likelihood => "likelihood",
            ScaleKind::Trustworthiness => "trustworthiness",
            ScaleKind::Impact => "impact",
            ScaleKind::Risk => "risk",
            ScaleKind::Population => "population",
        }
    }
}

/// A position on one scale. Only levels of the same scale are meaningfully ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    pub scale: ScaleKind,
    pub ordinal: u8,
}

impl Level {
    pub fn new(scale: ScaleKind, ordinal: u8) -> Self {
        Self { scale, ordinal }
    }

    pub fn ordinal(self) -> usize {
        self.ordinal as usize
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.scale, other.scale, "comparing levels of different scales");
        self.ordinal
            .cmp(&other.ordinal)
            .then_with(|| self.scale.cmp(&other.scale))
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDef {
    pub uri: String,
    pub label: String,
}

/// Named levels with dense ordinals `0..N-1`.
#[derive(Debug, Clone)]
pub struct OrdinalScale {
    kind: ScaleKind,
    levels: Vec<LevelDef>,
    by_uri: HashMap<String, u8>,
}

impl OrdinalScale {
    /// Build from `(uri, label, value)` entries in any order. Values must cover `0..N-1` exactly.
    pub fn new(kind: ScaleKind, entries: Vec<(String, String, usize)>) -> Result<Self> {
        let invalid = |message: String| Error::InvalidScale {
            scale: kind.as_str(),
            message,
        };
        if entries.is_empty() {
            return Err(invalid("no levels".into()));
        }
        if entries.len() > u8::MAX as usize {
            return Err(invalid(format!("{} levels exceeds limit", entries.len())));
        }
        let n = entries.len();
        let mut slots: Vec<Option<LevelDef>> = vec![None; n];
        let mut by_uri = HashMap::with_capacity(entries.len());
        for (uri, label, value) in entries {
            let slot = slots
                .get_mut(value)
                .ok_or_else(|| invalid(format!("level {} has value {} outside 0..{}", uri, value, n)))?;
            if slot.is_some() {
                return Err(invalid(format!("value {} assigned twice", value)));
            }
            if by_uri.insert(uri.clone(), value as u8).is_some() {
                return Err(invalid(format!("level {} listed twice", uri)));
            }
            *slot = Some(LevelDef { uri, label });
        }
        let levels = slots
            .into_iter()
            .enumerate()
            .map(|(i, l)| l.ok_or_else(|| invalid(format!("no level with value {}", i))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { kind, levels, by_uri })
    }

    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.levels.len()
    }

    pub fn level_by_uri(&self, uri: &str) -> Result<Level> {
        self.by_uri
            .get(uri)
            .map(|&o| Level::new(self.kind, o))
            .ok_or_else(|| Error::UnknownLevel {
                scale: self.kind.as_str(),
                uri: uri.to_string(),
            })
    }

    pub fn ordinal(&self, level: Level) -> usize {
        debug_assert_eq!(level.scale, self.kind);
        level.ordinal()
    }

    pub fn by_ordinal(&self, n: usize) -> Result<Level> {
        if n >= self.levels.len() {
            return Err(Error::OrdinalOutOfRange {
                scale: self.kind.as_str(),
                ordinal: n,
                size: self.levels.len(),
            });
        }
        Ok(Level::new(self.kind, n as u8))
    }

    /// `level` itself if it belongs to this scale.
    pub fn check(&self, level: Level) -> Result<Level> {
        if level.scale != self.kind {
            return Err(Error::WrongScale {
                expected: self.kind.as_str(),
                found: level.scale.as_str(),
            });
        }
        if level.ordinal() >= self.size() {
            return Err(Error::OrdinalOutOfRange {
                scale: self.kind.as_str(),
                ordinal: level.ordinal(),
                size: self.size(),
            });
        }
        Ok(level)
    }

    pub fn lowest(&self) -> Level {
        Level::new(self.kind, 0)
    }

    pub fn highest(&self) -> Level {
        Level::new(self.kind, (self.levels.len() - 1) as u8)
    }

    fn def(&self, level: Level) -> Option<&LevelDef> {
        if level.scale != self.kind {
            return None;
        }
        self.levels.get(level.ordinal())
    }

    /// URI of a level, or an empty string for a level that does not belong here.
    pub fn uri(&self, level: Level) -> &str {
        self.def(level).map(|d| d.uri.as_str()).unwrap_or_default()
    }

    pub fn label(&self, level: Level) -> &str {
        self.def(level).map(|d| d.label.as_str()).unwrap_or_default()
    }

    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        (0..self.levels.len()).map(move |o| Level::new(self.kind, o as u8))
    }
}

/// Mirror a level onto another scale of equal size: `n -> size - 1 - n`.
pub fn complement(level: Level, from: &OrdinalScale, to: &OrdinalScale) -> Result<Level> {
    if from.size() != to.size() {
        return Err(Error::ScaleMismatch {
            from: from.kind().as_str(),
            to: to.kind().as_str(),
            from_size: from.size(),
            to_size: to.size(),
        });
    }
    let ordinal = from.check(level)?.ordinal();
    to.by_ordinal(to.size() - 1 - ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(kind: ScaleKind, n: usize) -> OrdinalScale {
        let entries = (0..n)
            .map(|i| (format!("{}#{}", kind.as_str(), i), format!("L{}", i), i))
            .collect();
        OrdinalScale::new(kind, entries).unwrap()
    }

    #[test]
    fn rejects_gapped_values() {
        let err = OrdinalScale::new(
            ScaleKind::Impact,
            vec![("a".into(), "A".into(), 0), ("b".into(), "B".into(), 2)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidScale { .. }));
    }

    #[test]
    fn rejects_duplicate_values() {
        let err = OrdinalScale::new(
            ScaleKind::Impact,
            vec![("a".into(), "A".into(), 0), ("b".into(), "B".into(), 0)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidScale { .. }));
    }

    #[test]
    fn lookup_by_uri_and_ordinal() {
        let s = scale(ScaleKind::Likelihood, 5);
        let l = s.level_by_uri("likelihood#3").unwrap();
        assert_eq!(s.ordinal(l), 3);
        assert_eq!(s.by_ordinal(3).unwrap(), l);
        assert_eq!(s.label(l), "L3");
        assert!(s.by_ordinal(5).is_err());
        assert!(s.level_by_uri("nope").is_err());
    }

    #[test]
    fn complement_mirrors_ordinals() {
        let lh = scale(ScaleKind::Likelihood, 6);
        let tw = scale(ScaleKind::Trustworthiness, 6);
        let l = lh.by_ordinal(1).unwrap();
        let t = complement(l, &lh, &tw).unwrap();
        assert_eq!(t, Level::new(ScaleKind::Trustworthiness, 4));
        assert_eq!(complement(t, &tw, &lh).unwrap(), l);
    }

    #[test]
    fn complement_refuses_unequal_scales() {
        let lh = scale(ScaleKind::Likelihood, 5);
        let tw = scale(ScaleKind::Trustworthiness, 6);
        let err = complement(lh.lowest(), &lh, &tw).unwrap_err();
        assert!(matches!(err, Error::ScaleMismatch { from_size: 5, to_size: 6, .. }));
    }

    #[test]
    fn complement_rejects_foreign_levels() {
        let tw = scale(ScaleKind::Trustworthiness, 5);
        let lh = scale(ScaleKind::Likelihood, 5);
        let err = complement(Level::new(ScaleKind::Trustworthiness, 9), &tw, &lh).unwrap_err();
        assert!(matches!(err, Error::OrdinalOutOfRange { ordinal: 9, size: 5, .. }));
        let err = complement(Level::new(ScaleKind::Impact, 1), &tw, &lh).unwrap_err();
        assert!(matches!(err, Error::WrongScale { .. }));
    }
}
