//! Risk propagation over a [`CausationGraph`](crate::graph::CausationGraph).
//!
//! Stages run in order on a working copy of the graph:
//! 1. [`initialise`] resets computed state, reconciles triplets, enables strategies
//! 2. [`likelihood`] iterates threat and misbehaviour likelihood to a fixed point
//! 3. [`causation`] records actual causes, direct effects and external causes
//! 4. [`levels`] computes misbehaviour and threat risk
//! 5. [`paths`] classifies initial and root causes and indirect effects

mod causation;
mod engine;
mod initialise;
mod levels;
mod likelihood;
mod paths;

pub use engine::{RiskEngine, RiskResult};
pub use initialise::Suppression;

pub(crate) use initialise::consulted_control;

use crate::graph::RiskMode;
use crate::scale::{RiskTable, ScaleSet};

/// Read-only inputs shared by every stage of one run.
pub(crate) struct Context<'a> {
    pub scales: &'a ScaleSet,
    pub mode: RiskMode,
    pub table: RiskTable,
    pub suppression: Suppression,
}
