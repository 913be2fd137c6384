//! Error types for risk propagation and attack-path reasoning.
//!
//! Everything except [`Error::UnknownTarget`] and [`Error::InvalidTarget`] means the
//! model handed over by the construction step is unusable and the whole run aborts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No risk lookup table exists for this combination of scale sizes
    #[error("unsupported scale combination: impact={impact} likelihood={likelihood} risk={risk}")]
    UnsupportedRiskTable {
        impact: usize,
        likelihood: usize,
        risk: usize,
    },

    /// Complement requested between scales of different cardinality
    #[error("cannot complement {from} level into {to} scale: {from_size} vs {to_size} levels")]
    ScaleMismatch {
        from: &'static str,
        to: &'static str,
        from_size: usize,
        to_size: usize,
    },

    #[error("invalid {scale} scale: {message}")]
    InvalidScale { scale: &'static str, message: String },

    #[error("unknown {scale} level {uri}")]
    UnknownLevel { scale: &'static str, uri: String },

    #[error("{found} level used where a {expected} level is required")]
    WrongScale {
        expected: &'static str,
        found: &'static str,
    },

    #[error("ordinal {ordinal} out of range for {scale} scale ({size} levels)")]
    OrdinalOutOfRange {
        scale: &'static str,
        ordinal: usize,
        size: usize,
    },

    /// A URI referenced from an entity does not resolve to an entity of the expected kind
    #[error("{kind} {uri} references missing {expected} {target}")]
    MissingReference {
        kind: &'static str,
        uri: String,
        expected: &'static str,
        target: String,
    },

    #[error("{kind} {uri} has no domain model parent")]
    MissingParent { kind: &'static str, uri: String },

    #[error("duplicate uri {uri}")]
    DuplicateUri { uri: String },

    #[error("inconsistent triplet at {uri}: {message}")]
    InvalidTriplet { uri: String, message: String },

    /// A threat reached during backtrace has no actual causes
    #[error("threat {uri} has no causes")]
    CauselessThreat { uri: String },

    /// Target URI is not present in the model (caller-visible validation failure)
    #[error("unknown target {uri}")]
    UnknownTarget { uri: String },

    /// Target URI exists but is not a misbehaviour set
    #[error("target {uri} is not a misbehaviour set")]
    InvalidTarget { uri: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Recoverable request validation failures; everything else aborts the run.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::UnknownTarget { .. } | Error::InvalidTarget { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
