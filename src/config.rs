//! Engine configuration. Every section has defaults so a partial file is enough.

use crate::error::{Error, Result};
use crate::graph::RiskMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// JSON model document (scales + graph)
    pub model_path: PathBuf,
    /// Data directory (run store)
    pub data_dir: PathBuf,
    pub risk: RiskConfig,
    pub attack_path: AttackPathConfig,
    pub store: StoreConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub mode: RiskMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackPathConfig {
    /// Misbehaviour URIs to build attack trees for; empty skips tree building
    pub targets: Vec<String>,
    /// Keep every path instead of only the shortest ones
    pub all_paths: bool,
    /// Follow normal-operation causes from attack nodes
    pub include_normal_ops: bool,
    /// Largest DNF (in terms) reported before falling back to the simplified form
    pub dnf_max_terms: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.json"),
            data_dir: PathBuf::from(".dadm"),
            risk: RiskConfig::default(),
            attack_path: AttackPathConfig::default(),
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for AttackPathConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            all_paths: false,
            include_normal_ops: false,
            dnf_max_terms: 128,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. A missing file yields the defaults; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| Error::Configuration {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Location of the run store database.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("runs.db")
    }
}
