//! Boolean expressions over entity URIs, used for root causes and mitigations.
//!
//! Constructors simplify eagerly: nested operators are flattened, constants
//! folded, duplicates removed and absorbed operands dropped.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalExpr {
    False,
    True,
    Var(String),
    Not(Box<LogicalExpr>),
    And(BTreeSet<LogicalExpr>),
    Or(BTreeSet<LogicalExpr>),
}

type Term = BTreeSet<LogicalExpr>;

impl LogicalExpr {
    pub fn var(name: impl Into<String>) -> Self {
        LogicalExpr::Var(name.into())
    }

    pub fn not(expr: LogicalExpr) -> Self {
        match expr {
            LogicalExpr::False => LogicalExpr::True,
            LogicalExpr::True => LogicalExpr::False,
            LogicalExpr::Not(inner) => *inner,
            other => LogicalExpr::Not(Box::new(other)),
        }
    }

    pub fn and(operands: impl IntoIterator<Item = LogicalExpr>) -> Self {
        let mut set = BTreeSet::new();
        for op in operands {
            match op {
                LogicalExpr::True => {}
                LogicalExpr::False => return LogicalExpr::False,
                LogicalExpr::And(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        if set.iter().any(|x| set.contains(&LogicalExpr::not(x.clone()))) {
            return LogicalExpr::False;
        }
        let set = absorb(set, |keep, other| implies(keep, other));
        match set.len() {
            0 => LogicalExpr::True,
            1 => set.into_iter().next().unwrap_or(LogicalExpr::True),
            _ => LogicalExpr::And(set),
        }
    }

    pub fn or(operands: impl IntoIterator<Item = LogicalExpr>) -> Self {
        let mut set = BTreeSet::new();
        for op in operands {
            match op {
                LogicalExpr::False => {}
                LogicalExpr::True => return LogicalExpr::True,
                LogicalExpr::Or(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        if set.iter().any(|x| set.contains(&LogicalExpr::not(x.clone()))) {
            return LogicalExpr::True;
        }
        let set = absorb(set, |keep, other| implies(other, keep));
        match set.len() {
            0 => LogicalExpr::False,
            1 => set.into_iter().next().unwrap_or(LogicalExpr::False),
            _ => LogicalExpr::Or(set),
        }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, LogicalExpr::False)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, LogicalExpr::True)
    }

    pub fn evaluate(&self, value: &impl Fn(&str) -> bool) -> bool {
        match self {
            LogicalExpr::False => false,
            LogicalExpr::True => true,
            LogicalExpr::Var(name) => value(name.as_str()),
            LogicalExpr::Not(inner) => !inner.evaluate(value),
            LogicalExpr::And(ops) => ops.iter().all(|op| op.evaluate(value)),
            LogicalExpr::Or(ops) => ops.iter().any(|op| op.evaluate(value)),
        }
    }

    pub fn variables(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            LogicalExpr::False | LogicalExpr::True => {}
            LogicalExpr::Var(name) => {
                out.insert(name.as_str());
            }
            LogicalExpr::Not(inner) => inner.collect_variables(out),
            LogicalExpr::And(ops) | LogicalExpr::Or(ops) => {
                for op in ops {
                    op.collect_variables(out);
                }
            }
        }
    }

    /// Disjunctive normal form, or `None` once an intermediate step would need
    /// more than `max_terms` terms.
    pub fn to_dnf(&self, max_terms: usize) -> Option<LogicalExpr> {
        let terms = self.dnf_terms(max_terms)?;
        Some(LogicalExpr::or(terms.into_iter().map(LogicalExpr::and)))
    }

    fn dnf_terms(&self, max_terms: usize) -> Option<Vec<Term>> {
        match self {
            LogicalExpr::False => Some(Vec::new()),
            LogicalExpr::True => Some(vec![Term::new()]),
            LogicalExpr::Var(_) => Some(vec![Term::from([self.clone()])]),
            LogicalExpr::Not(inner) => match inner.as_ref() {
                LogicalExpr::Var(_) => Some(vec![Term::from([self.clone()])]),
                LogicalExpr::And(ops) => {
                    LogicalExpr::or(ops.iter().cloned().map(LogicalExpr::not)).dnf_terms(max_terms)
                }
                LogicalExpr::Or(ops) => {
                    LogicalExpr::and(ops.iter().cloned().map(LogicalExpr::not)).dnf_terms(max_terms)
                }
                other => LogicalExpr::not(other.clone()).dnf_terms(max_terms),
            },
            LogicalExpr::Or(ops) => {
                let mut terms = Vec::new();
                for op in ops {
                    terms.extend(op.dnf_terms(max_terms)?);
                    if terms.len() > max_terms {
                        return None;
                    }
                }
                Some(terms)
            }
            LogicalExpr::And(ops) => {
                let mut terms = vec![Term::new()];
                for op in ops {
                    let rhs = op.dnf_terms(max_terms)?;
                    if terms.len().saturating_mul(rhs.len()) > max_terms {
                        return None;
                    }
                    let mut product = Vec::with_capacity(terms.len() * rhs.len());
                    for left in &terms {
                        for right in &rhs {
                            let mut term = left.clone();
                            term.extend(right.iter().cloned());
                            product.push(term);
                        }
                    }
                    terms = product;
                }
                Some(terms)
            }
        }
    }
}

/// Whether `a` implies `b`, judged structurally.
fn implies(a: &LogicalExpr, b: &LogicalExpr) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (_, LogicalExpr::Or(bs)) if bs.contains(a) => true,
        (LogicalExpr::And(as_), _) if as_.contains(b) => true,
        (LogicalExpr::Or(as_), LogicalExpr::Or(bs)) => as_.is_subset(bs),
        (LogicalExpr::And(as_), LogicalExpr::And(bs)) => bs.is_subset(as_),
        _ => false,
    }
}

/// Drop every operand made redundant by another: `redundant(keep, drop)` says
/// that keeping `keep` makes `drop` unnecessary.
fn absorb(set: BTreeSet<LogicalExpr>, redundant: impl Fn(&LogicalExpr, &LogicalExpr) -> bool) -> BTreeSet<LogicalExpr> {
    let items: Vec<LogicalExpr> = set.into_iter().collect();
    items
        .iter()
        .enumerate()
        .filter(|(i, x)| {
            !items
                .iter()
                .enumerate()
                .any(|(j, y)| *i != j && redundant(y, x) && !(redundant(x, y) && j > *i))
        })
        .map(|(_, x)| x.clone())
        .collect()
}

impl fmt::Display for LogicalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, ops: &BTreeSet<LogicalExpr>, sep: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", op)?;
            }
            write!(f, ")")
        };
        match self {
            LogicalExpr::False => write!(f, "FALSE"),
            LogicalExpr::True => write!(f, "TRUE"),
            LogicalExpr::Var(name) => write!(f, "{}", name),
            LogicalExpr::Not(inner) => write!(f, "!{}", inner),
            LogicalExpr::And(ops) => join(f, ops, "&"),
            LogicalExpr::Or(ops) => join(f, ops, "|"),
        }
    }
}
