//! Synthetic layered models for the benchmarks.
#![allow(dead_code)]

use dadm_riskgraph::{CausationGraph, ModelDocument, RiskEngine, ScaleSet};
use serde_json::{json, Value};

fn levels(prefix: &str, n: usize) -> Value {
    Value::Array((0..n).map(|i| json!({"uri": format!("{prefix}{i}"), "value": i})).collect())
}

/// `depth` layers of `width` threats; each threat is caused by two neighbours of the
/// previous layer and every third one is blocked by a control strategy.
pub fn layered(width: usize, depth: usize) -> ModelDocument {
    let twas: Vec<Value> = (0..width)
        .map(|i| json!({"uri": format!("x{i}"), "asset": "host", "asserted": format!("tw{}", i % 5)}))
        .collect();
    let mut misbehaviours = Vec::new();
    let mut threats = Vec::new();
    let mut controls = Vec::new();
    let mut strategies = Vec::new();
    for k in 1..=depth {
        for i in 0..width {
            let j = (i + 1) % width;
            let uri = format!("t{k}_{i}");
            let mut threat = if k == 1 {
                json!({"uri": uri, "parent": "T.E", "entry_points": [format!("x{i}"), format!("x{j}")]})
            } else {
                json!({
                    "uri": uri, "parent": "T.S",
                    "secondary_effect_conditions": [
                        {"uri": format!("m{}_{i}", k - 1), "role": "r"},
                        {"uri": format!("m{}_{j}", k - 1), "role": if i % 2 == 0 { "r" } else { "s" }},
                    ],
                })
            };
            threat["effects"] = json!([format!("m{k}_{i}")]);
            if i % 3 == 0 {
                let cs = format!("c{k}_{i}");
                let csg = format!("g{k}_{i}");
                controls.push(json!({"uri": cs, "asset": "host", "active": k % 2 == 0, "coverage": "tw2"}));
                strategies.push(json!({"uri": csg, "parent": "CSG", "mandatory": [cs]}));
                threat["blocked_by"] = json!([csg]);
            }
            threats.push(threat);
            misbehaviours.push(json!({"uri": format!("m{k}_{i}"), "asset": "host", "impact": format!("im{}", (k + i) % 5)}));
        }
    }
    serde_json::from_value(json!({
        "scales": {
            "likelihood": levels("lh", 5),
            "trustworthiness": levels("tw", 5),
            "impact": levels("im", 5),
            "risk": levels("rk", 5),
            "population": levels("pop", 3),
        },
        "graph": {
            "assets": [{"uri": "host"}],
            "trustworthiness": twas,
            "misbehaviours": misbehaviours,
            "threats": threats,
            "controls": controls,
            "control_strategies": strategies,
        },
    }))
    .expect("synthetic model")
}

pub fn propagated(width: usize, depth: usize) -> (ScaleSet, CausationGraph) {
    let (scales, mut graph) = layered(width, depth).build().expect("valid model");
    RiskEngine::new(Default::default())
        .run(&mut graph, &scales)
        .expect("propagation");
    (scales, graph)
}
