//! SQLite store of completed runs: the inferred snapshot and attack trees of
//! each run, written in one transaction.

use crate::attack::TargetTree;
use crate::error::Result;
use crate::graph::{InferredSnapshot, RiskMode};
use crate::risk::RiskResult;
use crate::scale::ScaleSet;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    /// Completion time, ms since the epoch
    pub ts: i64,
    pub mode: RiskMode,
    /// SHA-256 of the asserted model document
    pub model_digest: String,
    pub overall_risk: String,
    pub snapshot: InferredSnapshot,
    pub trees: BTreeMap<String, TargetTree>,
}

impl RunRecord {
    pub fn new(
        result: &RiskResult,
        scales: &ScaleSet,
        model_digest: String,
        snapshot: InferredSnapshot,
        trees: BTreeMap<String, TargetTree>,
    ) -> Self {
        Self {
            id: result.run_id.clone(),
            ts: result.ts,
            mode: result.mode,
            model_digest,
            overall_risk: scales.uri(result.overall_risk).to_string(),
            snapshot,
            trees,
        }
    }
}

pub struct RunStore {
    conn: Connection,
}

impl RunStore {
    /// Open or create DB at path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                ts INTEGER NOT NULL,
                mode TEXT NOT NULL,
                model_digest TEXT NOT NULL,
                overall_risk TEXT NOT NULL,
                snapshot TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_runs_ts ON runs(ts);
            CREATE INDEX IF NOT EXISTS idx_runs_digest ON runs(model_digest, ts);
            CREATE TABLE IF NOT EXISTS attack_trees (
                run_id TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
                target TEXT NOT NULL,
                tree TEXT NOT NULL,
                PRIMARY KEY (run_id, target)
            );
            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Write the run and its trees; nothing is stored if any statement fails.
    pub fn record_run(&mut self, run: &RunRecord) -> Result<()> {
        let snapshot = serde_json::to_string(&run.snapshot)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO runs (id, ts, mode, model_digest, overall_risk, snapshot) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run.id, run.ts, run.mode.as_str(), run.model_digest, run.overall_risk, snapshot],
        )?;
        tx.execute("DELETE FROM attack_trees WHERE run_id = ?1", params![run.id])?;
        for (target, tree) in &run.trees {
            tx.execute(
                "INSERT INTO attack_trees (run_id, target, tree) VALUES (?1, ?2, ?3)",
                params![run.id, target, serde_json::to_string(tree)?],
            )?;
        }
        tx.commit()?;
        debug!(run_id = %run.id, trees = run.trees.len(), "run recorded");
        Ok(())
    }

    pub fn get_run(&self, id: &str) -> Result<Option<RunRecord>> {
        self.find("SELECT id, ts, mode, model_digest, overall_risk, snapshot FROM runs WHERE id = ?1", id)
    }

    /// Most recent run of the model with this digest.
    pub fn latest_for_model(&self, digest: &str) -> Result<Option<RunRecord>> {
        self.find(
            "SELECT id, ts, mode, model_digest, overall_risk, snapshot FROM runs WHERE model_digest = ?1 ORDER BY ts DESC LIMIT 1",
            digest,
        )
    }

    fn find(&self, sql: &str, key: &str) -> Result<Option<RunRecord>> {
        let row = self
            .conn
            .query_row(sql, params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;
        let Some((id, ts, mode, model_digest, overall_risk, snapshot)) = row else {
            return Ok(None);
        };
        let trees = self.attack_trees(&id)?;
        Ok(Some(RunRecord {
            id,
            ts,
            mode: mode.parse()?,
            model_digest,
            overall_risk,
            snapshot: serde_json::from_str(&snapshot)?,
            trees,
        }))
    }

    pub fn attack_trees(&self, run_id: &str) -> Result<BTreeMap<String, TargetTree>> {
        let mut stmt = self
            .conn
            .prepare("SELECT target, tree FROM attack_trees WHERE run_id = ?1 ORDER BY target")?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut trees = BTreeMap::new();
        for row in rows {
            let (target, tree) = row?;
            trees.insert(target, serde_json::from_str(&tree)?);
        }
        Ok(trees)
    }

    /// Retention: delete runs older than given timestamp
    pub fn prune_before(&mut self, ts: i64) -> Result<u64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM attack_trees WHERE run_id IN (SELECT id FROM runs WHERE ts < ?1)",
            params![ts],
        )?;
        let n = tx.execute("DELETE FROM runs WHERE ts < ?1", params![ts])?;
        tx.commit()?;
        Ok(n as u64)
    }
}
