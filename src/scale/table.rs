//! Risk = f(impact, likelihood) lookup, one fixed matrix per supported scale geometry.

use super::{Level, ScaleKind, ScaleSet};
use crate::error::{Error, Result};

type Matrix = &'static [&'static [u8]];

// Rows are impact ordinals, columns likelihood ordinals, cells risk ordinals.
const I5_L5_R5: Matrix = &[
    &[0, 0, 0, 1, 1],
    &[0, 0, 1, 1, 2],
    &[0, 1, 2, 2, 3],
    &[1, 1, 2, 3, 4],
    &[1, 2, 3, 4, 4],
];

const I5_L6_R5: Matrix = &[
    &[0, 0, 0, 0, 1, 1],
    &[0, 0, 0, 1, 1, 2],
    &[0, 0, 1, 2, 2, 3],
    &[0, 1, 1, 2, 3, 4],
    &[1, 1, 2, 3, 4, 4],
];

const I6_L6_R5: Matrix = &[
    &[0, 0, 0, 0, 0, 1],
    &[0, 0, 0, 0, 1, 1],
    &[0, 0, 0, 1, 1, 2],
    &[0, 0, 1, 2, 2, 3],
    &[0, 1, 1, 2, 3, 4],
    &[1, 1, 2, 3, 4, 4],
];

const I6_L6_R6: Matrix = &[
    &[0, 0, 0, 0, 1, 1],
    &[0, 0, 0, 1, 1, 2],
    &[0, 0, 1, 2, 2, 3],
    &[0, 1, 2, 3, 3, 4],
    &[1, 1, 2, 3, 4, 5],
    &[1, 2, 3, 4, 5, 5],
];

#[derive(Debug, Clone, Copy)]
pub struct RiskTable {
    matrix: Matrix,
}

impl RiskTable {
    /// Select the matrix for the (impact, likelihood, risk) scale sizes of `scales`.
    pub fn for_scales(scales: &ScaleSet) -> Result<Self> {
        Self::for_sizes(
            scales.impact.size(),
            scales.likelihood.size(),
            scales.risk.size(),
        )
    }

    pub fn for_sizes(impact: usize, likelihood: usize, risk: usize) -> Result<Self> {
        let matrix = match (impact, likelihood, risk) {
            (5, 5, 5) => I5_L5_R5,
            (5, 6, 5) => I5_L6_R5,
            (6, 6, 5) => I6_L6_R5,
            (6, 6, 6) => I6_L6_R6,
            _ => {
                return Err(Error::UnsupportedRiskTable {
                    impact,
                    likelihood,
                    risk,
                })
            }
        };
        Ok(Self { matrix })
    }

    pub fn impact_size(&self) -> usize {
        self.matrix.len()
    }

    pub fn likelihood_size(&self) -> usize {
        self.matrix[0].len()
    }

    pub fn lookup(&self, impact: Level, likelihood: Level) -> Result<Level> {
        let out_of_range = |scale: ScaleKind, ordinal: usize, size: usize| Error::OrdinalOutOfRange {
            scale: scale.as_str(),
            ordinal,
            size,
        };
        let row = self
            .matrix
            .get(impact.ordinal())
            .ok_or_else(|| out_of_range(ScaleKind::Impact, impact.ordinal(), self.impact_size()))?;
        let cell = row.get(likelihood.ordinal()).ok_or_else(|| {
            out_of_range(
                ScaleKind::Likelihood,
                likelihood.ordinal(),
                self.likelihood_size(),
            )
        })?;
        Ok(Level::new(ScaleKind::Risk, *cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORTED: [(usize, usize, usize); 4] = [(5, 5, 5), (5, 6, 5), (6, 6, 5), (6, 6, 6)];

    #[test]
    fn tables_are_total_and_monotone() {
        for (i, l, r) in SUPPORTED {
            let table = RiskTable::for_sizes(i, l, r).unwrap();
            assert_eq!(table.impact_size(), i);
            for imp in 0..i {
                assert_eq!(table.matrix[imp].len(), l);
                for lh in 0..l {
                    let risk = table
                        .lookup(
                            Level::new(ScaleKind::Impact, imp as u8),
                            Level::new(ScaleKind::Likelihood, lh as u8),
                        )
                        .unwrap();
                    assert!(risk.ordinal() < r);
                    if imp > 0 {
                        assert!(table.matrix[imp - 1][lh] <= risk.ordinal);
                    }
                    if lh > 0 {
                        assert!(table.matrix[imp][lh - 1] <= risk.ordinal);
                    }
                }
            }
            // Extremes span the whole risk scale.
            assert_eq!(table.matrix[0][0], 0);
            assert_eq!(table.matrix[i - 1][l - 1] as usize, r - 1);
        }
    }

    #[test]
    fn unsupported_geometry_is_rejected() {
        let err = RiskTable::for_sizes(4, 5, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedRiskTable {
                impact: 4,
                likelihood: 5,
                risk: 5
            }
        ));
    }
}
