//! Model builders shared by the integration tests and property tests.
#![allow(dead_code)]

use dadm_riskgraph::{CausationGraph, ModelDocument, RiskEngine, RiskMode, RiskResult, ScaleSet};
use serde_json::{json, Value};

/// `n` dense levels named `{prefix}0 .. {prefix}{n-1}`.
pub fn levels(prefix: &str, n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({"uri": format!("{prefix}{i}"), "label": format!("{prefix} {i}"), "value": i}))
            .collect(),
    )
}

/// Scales with `n` likelihood, trustworthiness, impact and risk levels.
pub fn scales(n: usize) -> Value {
    json!({
        "likelihood": levels("lh", n),
        "trustworthiness": levels("tw", n),
        "impact": levels("im", n),
        "risk": levels("rk", n),
        "population": levels("pop", 3),
    })
}

pub fn document(n: usize, graph: Value) -> ModelDocument {
    serde_json::from_value(json!({"scales": scales(n), "graph": graph})).expect("model document")
}

pub fn model(graph: Value) -> (ScaleSet, CausationGraph) {
    document(5, graph).build().expect("valid model")
}

pub fn propagate(graph: Value) -> (ScaleSet, CausationGraph, RiskResult) {
    let (scales, mut g) = model(graph);
    let result = RiskEngine::new(Default::default())
        .propagate(&mut g, &scales, RiskMode::Current)
        .expect("propagation");
    (scales, g, result)
}

pub fn threat_likelihood(scales: &ScaleSet, graph: &CausationGraph, uri: &str) -> String {
    scales.uri(graph.threat_by_uri(uri).expect(uri).likelihood).to_string()
}

pub fn ms_likelihood(scales: &ScaleSet, graph: &CausationGraph, uri: &str) -> String {
    scales.uri(graph.misbehaviour_by_uri(uri).expect(uri).likelihood).to_string()
}

pub fn caused_by(graph: &CausationGraph, uri: &str) -> Vec<String> {
    let mut out: Vec<String> = graph
        .threat_by_uri(uri)
        .expect(uri)
        .caused_by
        .iter()
        .map(|&n| graph.node_uri(n).to_string())
        .collect();
    out.sort();
    out
}

/// Root → A → Target and Root → B → C → Target.
pub fn diamond() -> Value {
    json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "root", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [
            {"uri": "target", "asset": "host", "impact": "im4"},
            {"uri": "m_c", "asset": "host", "impact": "im1"},
        ],
        "threats": [
            {"uri": "t_a", "parent": "T.A", "asset": "host", "entry_points": ["root"], "effects": ["target"], "blocked_by": ["g_a"]},
            {"uri": "t_b", "parent": "T.B", "asset": "host", "entry_points": ["root"], "effects": ["m_c"]},
            {"uri": "t_c", "parent": "T.C", "asset": "host", "secondary_effect_conditions": ["m_c"], "effects": ["target"]},
        ],
        "controls": [{"uri": "c_a", "asset": "host"}],
        "control_strategies": [{"uri": "g_a", "parent": "CSG.A", "mandatory": ["c_a"]}],
    })
}

/// Target M is caused by T1 (from external X) and by T2, which M itself causes.
pub fn loop_model() -> Value {
    json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "x", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [{"uri": "m", "asset": "host", "impact": "im3"}],
        "threats": [
            {"uri": "t1", "parent": "T.1", "asset": "host", "entry_points": ["x"], "effects": ["m"]},
            {"uri": "t2", "parent": "T.2", "asset": "host", "secondary_effect_conditions": ["m"], "effects": ["m"]},
        ],
    })
}
