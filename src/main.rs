//! DADM risk graph entrypoint: load a model, propagate risk, build the
//! configured attack trees and record the run.

use dadm_riskgraph::{
    attack::AttackPathEngine,
    config::EngineConfig,
    graph::ModelDocument,
    logging::{LogEvent, StructuredLogger},
    risk::RiskEngine,
    storage::{RunRecord, RunStore},
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

fn run(config: &EngineConfig) -> dadm_riskgraph::Result<()> {
    let document = ModelDocument::load(&config.model_path)?;
    let digest = document.digest()?;
    let (scales, mut graph) = document.build()?;
    info!(
        model = %config.model_path.display(),
        digest = %digest,
        threats = graph.threats().len(),
        misbehaviours = graph.misbehaviours().len(),
        "model loaded"
    );

    let engine = RiskEngine::new(config.risk.clone());
    let result = engine.run(&mut graph, &scales)?;

    let trees = if config.attack_path.targets.is_empty() {
        BTreeMap::new()
    } else {
        AttackPathEngine::new(&graph, &scales, config.attack_path.clone())
            .run(result.mode)?
            .per_target
    };

    if config.store.enabled {
        std::fs::create_dir_all(&config.data_dir)?;
        let mut store = RunStore::open(&config.store_path())?;
        if let Some(previous) = store.latest_for_model(&digest)? {
            if previous.mode == result.mode && previous.snapshot != graph.inferred_snapshot(&scales) {
                tracing::warn!(previous = %previous.id, "inferred state differs from previous run of the same model");
            }
        }
        let record = RunRecord::new(&result, &scales, digest, graph.inferred_snapshot(&scales), trees.clone());
        store.record_run(&record)?;
    }

    let mut stdout = std::io::stdout();
    let mut summary = LogEvent::new("info", "risk run complete");
    summary.run_id = Some(&result.run_id);
    summary.mode = Some(result.mode.as_str());
    summary.overall_risk = Some(scales.uri(result.overall_risk));
    StructuredLogger::emit_json(&summary, &mut stdout)?;
    for (target, tree) in &trees {
        let mut line = LogEvent::new("info", "attack tree");
        line.run_id = Some(&result.run_id);
        line.target = Some(target);
        line.root_cause = Some(&tree.root_cause);
        StructuredLogger::emit_json(&line, &mut stdout)?;
    }
    Ok(())
}

fn main() -> std::process::ExitCode {
    let config_path = std::env::var("DADM_RISK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = match EngineConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return std::process::ExitCode::FAILURE;
        }
    };

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), mode = config.risk.mode.as_str(), "DADM risk graph starting");

    match run(&config) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, validation = e.is_validation(), "run failed");
            let message = e.to_string();
            let mut line = LogEvent::new("error", "run failed");
            line.error = Some(&message);
            let _ = StructuredLogger::emit_json(&line, &mut std::io::stderr());
            std::process::ExitCode::FAILURE
        }
    }
}
