//! DADM risk graph: risk propagation and attack-path analysis over a causation
//! graph of threats, misbehaviours, trustworthiness attributes and controls.
//!
//! Modular structure:
//! - [`scale`]: Ordinal scales, complements and the risk lookup table
//! - [`graph`]: Causation graph arena and its JSON interchange format
//! - [`risk`]: Risk propagation engine
//! - [`attack`]: Attack trees, root causes and mitigation expressions
//! - [`storage`]: Run store (SQLite)
//! - [`logging`]: Structured JSON logging

pub mod attack;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod risk;
pub mod scale;
pub mod storage;

pub use attack::{AttackPathEngine, AttackTreeReport, LogicalExpr};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use graph::{CausationGraph, ModelDocument, RiskMode};
pub use logging::StructuredLogger;
pub use risk::{RiskEngine, RiskResult};
pub use scale::{Level, ScaleSet};
pub use storage::RunStore;
