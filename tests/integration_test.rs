//! Integration test: model load, propagation scenarios, attack trees, run store.

mod common;

use common::*;
use dadm_riskgraph::{
    attack::{AttackPathEngine, LinkKind},
    config::{AttackPathConfig, RiskConfig},
    graph::ModelDocument,
    scale::ScaleKind,
    storage::{RunRecord, RunStore},
    Error, Level, RiskEngine, RiskMode,
};
use serde_json::json;

fn attack_engine_report(
    graph: &dadm_riskgraph::CausationGraph,
    scales: &dadm_riskgraph::ScaleSet,
    target: &str,
    all_paths: bool,
    include_normal_ops: bool,
) -> dadm_riskgraph::AttackTreeReport {
    AttackPathEngine::new(graph, scales, AttackPathConfig::default())
        .build_tree(&[target.to_string()], RiskMode::Current, all_paths, include_normal_ops)
        .unwrap()
}

#[test]
fn model_load_rejects_missing_parent() {
    let doc = document(
        5,
        json!({
            "assets": [{"uri": "host"}],
            "trustworthiness": [{"uri": "x", "asset": "host"}],
            "threats": [{"uri": "t", "entry_points": ["x"]}],
        }),
    );
    assert!(matches!(doc.build(), Err(Error::MissingParent { .. })));
}

#[test]
fn model_load_rejects_dangling_reference() {
    let doc = document(
        5,
        json!({
            "assets": [{"uri": "host"}],
            "threats": [{"uri": "t", "parent": "T", "entry_points": ["nowhere"]}],
        }),
    );
    assert!(matches!(doc.build(), Err(Error::MissingReference { .. })));
}

#[test]
fn model_document_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let doc = document(5, diamond());
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let loaded = ModelDocument::load(&path).unwrap();
    assert_eq!(loaded.digest().unwrap(), doc.digest().unwrap());
    let (_, graph) = loaded.build().unwrap();
    assert_eq!(graph.threats().len(), 3);
}

#[test]
fn threat_is_limited_by_its_weakest_cause() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [
            {"uri": "tw_m1", "asset": "host", "asserted": "tw0", "misbehaviour": "m1"},
            {"uri": "tw_m2", "asset": "host", "asserted": "tw3", "misbehaviour": "m2"},
        ],
        "misbehaviours": [
            {"uri": "m1", "asset": "host"},
            {"uri": "m2", "asset": "host"},
            {"uri": "out", "asset": "host", "impact": "im2"},
        ],
        "threats": [{
            "uri": "t1", "parent": "T.1", "asset": "host",
            "secondary_effect_conditions": ["m1", "m2"], "effects": ["out"],
        }],
    }));
    assert_eq!(ms_likelihood(&scales, &graph, "m1"), "lh4");
    assert_eq!(ms_likelihood(&scales, &graph, "m2"), "lh1");
    assert_eq!(threat_likelihood(&scales, &graph, "t1"), "lh1");
    assert_eq!(caused_by(&graph, "t1"), vec!["m1", "m2"]);
    assert_eq!(ms_likelihood(&scales, &graph, "out"), "lh1");
}

#[test]
fn causes_sharing_a_role_are_alternatives() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [
            {"uri": "tw_m1", "asset": "host", "asserted": "tw0", "misbehaviour": "m1"},
            {"uri": "tw_m2", "asset": "host", "asserted": "tw3", "misbehaviour": "m2"},
        ],
        "misbehaviours": [{"uri": "m1", "asset": "host"}, {"uri": "m2", "asset": "host"}],
        "threats": [{
            "uri": "t1", "parent": "T.1",
            "secondary_effect_conditions": [{"uri": "m1", "role": "r"}, {"uri": "m2", "role": "r"}],
        }],
    }));
    assert_eq!(threat_likelihood(&scales, &graph, "t1"), "lh4");
    assert_eq!(caused_by(&graph, "t1"), vec!["m1"]);
}

#[test]
fn a_role_groups_causes_per_asset() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "client"}, {"uri": "server"}],
        "trustworthiness": [
            {"uri": "tw_c", "asset": "client", "asserted": "tw0", "misbehaviour": "m_c"},
            {"uri": "tw_s", "asset": "server", "asserted": "tw3", "misbehaviour": "m_s"},
        ],
        "misbehaviours": [{"uri": "m_c", "asset": "client"}, {"uri": "m_s", "asset": "server"}],
        "threats": [{
            "uri": "t1", "parent": "T.1",
            "secondary_effect_conditions": [{"uri": "m_c", "role": "r"}, {"uri": "m_s", "role": "r"}],
        }],
    }));
    // one role on two assets is two required conditions
    assert_eq!(threat_likelihood(&scales, &graph, "t1"), "lh1");
    assert_eq!(caused_by(&graph, "t1"), vec!["m_c", "m_s"]);
}

#[test]
fn only_sufficiently_likely_causes_are_actual_causes() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [
            {"uri": "ta", "asset": "host", "asserted": "tw1"},
            {"uri": "tb", "asset": "host", "asserted": "tw3"},
            {"uri": "tc", "asset": "host", "asserted": "tw1"},
        ],
        "threats": [{
            "uri": "t", "parent": "T",
            "entry_points": [{"uri": "ta", "role": "r"}, {"uri": "tb", "role": "r"}, "tc"],
        }],
    }));
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh3");
    assert_eq!(caused_by(&graph, "t"), vec!["ta", "tc"]);
    let ta = graph.twas_by_uri("ta").unwrap();
    assert!(ta.external_cause);
    assert_eq!(ta.caused_threats.len(), 1);
    assert!(graph.twas_by_uri("tb").unwrap().caused_threats.is_empty());
}

#[test]
fn direct_effects_require_exact_likelihood() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [
            {"uri": "ta", "asset": "host", "asserted": "tw1"},
            {"uri": "tb", "asset": "host", "asserted": "tw3"},
        ],
        "misbehaviours": [{"uri": "shared", "asset": "host"}, {"uri": "own", "asset": "host"}],
        "threats": [
            {"uri": "t_low", "parent": "T", "entry_points": ["tb"], "effects": ["shared"]},
            {"uri": "t_high", "parent": "T", "entry_points": ["ta"], "effects": ["shared", "own"]},
        ],
    }));
    assert_eq!(ms_likelihood(&scales, &graph, "shared"), "lh3");
    assert!(graph.threat_by_uri("t_low").unwrap().direct_effects.is_empty());
    assert_eq!(graph.threat_by_uri("t_high").unwrap().direct_effects.len(), 2);
    let shared = graph.misbehaviour_by_uri("shared").unwrap();
    assert_eq!(shared.caused_by.len(), 1);
    assert_eq!(graph.threat(shared.caused_by[0]).uri, "t_high");
}

#[test]
fn blocking_strategy_caps_likelihood_until_disabled() {
    let (scales, mut graph) = model(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [{"uri": "m", "asset": "host", "impact": "im3"}],
        "threats": [{"uri": "t", "parent": "T", "entry_points": ["ta"], "effects": ["m"], "blocked_by": ["g"]}],
        "controls": [{"uri": "c", "asset": "host", "active": true, "coverage": "tw3"}],
        "control_strategies": [{"uri": "g", "parent": "CSG", "mandatory": ["c"]}],
    }));
    let engine = RiskEngine::new(RiskConfig::default());
    engine.run(&mut graph, &scales).unwrap();
    assert!(graph.strategy_by_uri("g").unwrap().enabled);
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh1");
    let blocked_risk = graph.misbehaviour_by_uri("m").unwrap().risk;

    graph.set_control_active("c", false).unwrap();
    engine.run(&mut graph, &scales).unwrap();
    assert!(!graph.strategy_by_uri("g").unwrap().enabled);
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh3");
    assert!(graph.misbehaviour_by_uri("m").unwrap().risk >= blocked_risk);
}

#[test]
fn strategy_outside_run_mode_does_not_block() {
    let (scales, mut graph) = model(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw1"}],
        "threats": [{"uri": "t", "parent": "T", "entry_points": ["ta"], "blocked_by": ["g"]}],
        "controls": [{"uri": "c", "asset": "host", "active": true, "coverage": "tw4"}],
        "control_strategies": [{"uri": "g", "parent": "CSG", "mandatory": ["c"], "current_risk": false}],
    }));
    let engine = RiskEngine::new(RiskConfig::default());
    engine.propagate(&mut graph, &scales, RiskMode::Current).unwrap();
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh3");
    engine.propagate(&mut graph, &scales, RiskMode::Future).unwrap();
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh0");
}

#[test]
fn frequency_caps_likelihood() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw0"}],
        "threats": [{"uri": "t", "parent": "T", "entry_points": ["ta"], "frequency": "lh2"}],
    }));
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh2");
}

#[test]
fn triggered_threat_needs_an_enabled_trigger() {
    let (scales, mut graph) = model(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [{"uri": "m", "asset": "host"}],
        "threats": [{
            "uri": "t", "parent": "T", "entry_points": ["ta"], "effects": ["m"],
            "triggered": true, "triggered_by": ["g"],
        }],
        "controls": [{"uri": "c", "asset": "host"}],
        "control_strategies": [{"uri": "g", "parent": "CSG", "mandatory": ["c"]}],
    }));
    let engine = RiskEngine::new(RiskConfig::default());
    let result = engine.run(&mut graph, &scales).unwrap();
    assert!(graph.threat_by_uri("t").unwrap().skipped);
    assert_eq!(result.threats_skipped, 1);
    assert_eq!(ms_likelihood(&scales, &graph, "m"), "lh0");

    graph.set_control_active("c", true).unwrap();
    engine.run(&mut graph, &scales).unwrap();
    assert!(!graph.threat_by_uri("t").unwrap().skipped);
    assert_eq!(ms_likelihood(&scales, &graph, "m"), "lh3");
}

#[test]
fn optional_control_of_trigger_suppresses_cause_on_its_asset() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}, {"uri": "other"}],
        "trustworthiness": [
            {"uri": "ta", "asset": "host", "asserted": "tw1"},
            {"uri": "tz", "asset": "other", "asserted": "tw1"},
        ],
        "threats": [
            {"uri": "t", "parent": "T", "entry_points": ["ta"], "triggered": true, "triggered_by": ["g"]},
            {"uri": "u", "parent": "T", "entry_points": ["tz"], "triggered": true, "triggered_by": ["g"]},
        ],
        "controls": [
            {"uri": "c", "asset": "host", "active": true},
            {"uri": "c_opt", "asset": "host", "active": true, "coverage": "tw2"},
        ],
        "control_strategies": [{"uri": "g", "parent": "CSG", "mandatory": ["c"], "optional": ["c_opt"]}],
    }));
    assert_eq!(threat_likelihood(&scales, &graph, "t"), "lh2");
    assert_eq!(threat_likelihood(&scales, &graph, "u"), "lh3");
    assert_eq!(caused_by(&graph, "t"), vec!["ta"]);
}

#[test]
fn trigger_roles_consult_opposite_triplet_members() {
    let (_, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw1"}],
        "threats": [
            {"uri": "t_nec", "parent": "T", "entry_points": ["ta"], "triggered": true, "triggered_by": ["g_nec"]},
            {"uri": "t_suf", "parent": "T", "entry_points": ["ta"], "triggered": true, "triggered_by": ["g_suf"]},
        ],
        "controls": [
            {"uri": "c", "asset": "host", "active": true, "has_min": "c_min", "has_max": "c_max"},
            {"uri": "c_min", "asset": "host", "active": false, "min_of": "c"},
            {"uri": "c_max", "asset": "host", "active": true, "max_of": "c"},
        ],
        "control_strategies": [
            {"uri": "g_nec", "parent": "CSG", "mandatory": ["c"], "trigger_role": "necessary"},
            {"uri": "g_suf", "parent": "CSG", "mandatory": ["c"], "trigger_role": "sufficient"},
        ],
    }));
    assert!(!graph.strategy_by_uri("g_nec").unwrap().enabled);
    assert!(graph.strategy_by_uri("g_suf").unwrap().enabled);
    assert!(graph.threat_by_uri("t_nec").unwrap().skipped);
    assert!(!graph.threat_by_uri("t_suf").unwrap().skipped);
}

#[test]
fn inverted_triplet_is_adjusted_not_rejected() {
    let (scales, mut graph) = document(
        6,
        json!({
            "assets": [{"uri": "host"}],
            "trustworthiness": [
                {"uri": "tw", "asset": "host", "asserted": "tw3", "has_min": "tw_lo", "has_max": "tw_hi"},
                {"uri": "tw_lo", "asset": "host", "asserted": "tw5", "min_of": "tw"},
                {"uri": "tw_hi", "asset": "host", "asserted": "tw4", "max_of": "tw"},
            ],
        }),
    )
    .build()
    .unwrap();
    RiskEngine::new(RiskConfig::default())
        .propagate(&mut graph, &scales, RiskMode::Current)
        .unwrap();

    let level = |uri: &str| scales.uri(graph.twas_by_uri(uri).unwrap().inferred_level).to_string();
    assert_eq!(level("tw_lo"), "tw3");
    assert_eq!(level("tw"), "tw3");
    assert_eq!(level("tw_hi"), "tw4");
    // the asserted input itself is left as supplied
    assert_eq!(scales.uri(graph.twas_by_uri("tw_lo").unwrap().asserted_level.unwrap()), "tw5");
}

#[test]
fn scale_mismatch_aborts_and_leaves_graph_unchanged() {
    let doc: ModelDocument = serde_json::from_value(json!({
        "scales": {
            "likelihood": levels("lh", 6),
            "trustworthiness": levels("tw", 5),
            "impact": levels("im", 5),
            "risk": levels("rk", 5),
            "population": levels("pop", 3),
        },
        "graph": {
            "assets": [{"uri": "host"}],
            "trustworthiness": [{"uri": "ta", "asset": "host", "asserted": "tw1"}],
            "threats": [{"uri": "t", "parent": "T", "entry_points": ["ta"]}],
        },
    }))
    .unwrap();
    let (scales, mut graph) = doc.build().unwrap();
    let before = graph.inferred_snapshot(&scales);
    let err = RiskEngine::new(RiskConfig::default()).run(&mut graph, &scales).unwrap_err();
    assert!(matches!(err, Error::ScaleMismatch { .. }));
    assert!(!err.is_validation());
    assert_eq!(graph.inferred_snapshot(&scales), before);
}

#[test]
fn asserted_levels_must_come_from_the_trustworthiness_scale() {
    let (scales, mut graph) = model(loop_model());
    let err = graph
        .set_asserted_level(&scales, "x", Some(Level::new(ScaleKind::Likelihood, 3)))
        .unwrap_err();
    assert!(matches!(err, Error::WrongScale { expected: "trustworthiness", .. }));
    let err = graph
        .set_asserted_level(&scales, "x", Some(Level::new(ScaleKind::Trustworthiness, 9)))
        .unwrap_err();
    assert!(matches!(err, Error::OrdinalOutOfRange { ordinal: 9, size: 5, .. }));

    graph
        .set_asserted_level(&scales, "x", Some(Level::new(ScaleKind::Trustworthiness, 3)))
        .unwrap();
    RiskEngine::new(RiskConfig::default())
        .propagate(&mut graph, &scales, RiskMode::Current)
        .unwrap();
    assert_eq!(threat_likelihood(&scales, &graph, "t1"), "lh1");
}

#[test]
fn propagation_is_idempotent() {
    let (scales, mut graph) = model(diamond());
    let engine = RiskEngine::new(RiskConfig::default());
    engine.run(&mut graph, &scales).unwrap();
    let first = graph.inferred_snapshot(&scales);
    engine.run(&mut graph, &scales).unwrap();
    assert_eq!(graph.inferred_snapshot(&scales), first);
}

#[test]
fn threat_risk_follows_downstream_effects() {
    let (scales, graph, result) = propagate(diamond());
    let risk = |uri: &str| scales.uri(graph.threat_by_uri(uri).unwrap().risk).to_string();
    assert_eq!(scales.uri(graph.misbehaviour_by_uri("m_c").unwrap().risk), "rk1");
    assert_eq!(scales.uri(graph.misbehaviour_by_uri("target").unwrap().risk), "rk4");
    assert_eq!(risk("t_c"), "rk4");
    assert_eq!(risk("t_b"), "rk4");
    assert_eq!(scales.uri(result.overall_risk), "rk4");
}

#[test]
fn classifies_normal_operation_and_attack_paths() {
    let (_, graph, result) = propagate(normal_op_model());
    let n = graph.threat_by_uri("n").unwrap();
    let a = graph.threat_by_uri("a").unwrap();
    assert!(n.flags.initial_cause);
    assert!(!n.flags.root_cause);
    assert!(a.flags.root_cause);
    assert!(graph.misbehaviour_by_uri("m_n").unwrap().normal_op_effect);
    assert!(!graph.misbehaviour_by_uri("target").unwrap().normal_op_effect);
    assert_eq!(result.initial_causes, 1);
    assert_eq!(result.root_causes, 1);

    let threats: Vec<&str> = n.indirect_threats.iter().map(|&t| graph.threat(t).uri.as_str()).collect();
    let effects: Vec<&str> = n.indirect_effects.iter().map(|&m| graph.misbehaviour(m).uri.as_str()).collect();
    assert_eq!(threats, vec!["a"]);
    assert_eq!(effects, vec!["target"]);
    assert!(a.indirect_threats.is_empty());
}

#[test]
fn secondary_threat_on_external_causes_is_an_initial_cause() {
    let (_, graph, result) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "tw_m", "asset": "host", "asserted": "tw1", "misbehaviour": "m"}],
        "misbehaviours": [
            {"uri": "m", "asset": "host"},
            {"uri": "out", "asset": "host", "impact": "im3"},
            {"uri": "next", "asset": "host", "impact": "im4"},
        ],
        "threats": [
            {"uri": "s", "parent": "T.S", "secondary_effect_conditions": ["m"], "effects": ["out"]},
            {"uri": "a", "parent": "T.A", "secondary_effect_conditions": ["out"], "effects": ["next"]},
        ],
    }));
    assert!(graph.misbehaviour_by_uri("m").unwrap().external_cause);
    let s = graph.threat_by_uri("s").unwrap();
    assert!(s.flags.secondary_threat);
    assert!(s.flags.initial_cause);
    assert!(!s.flags.root_cause);
    assert!(graph.misbehaviour_by_uri("out").unwrap().normal_op_effect);

    // a secondary threat fed by a normal-operation effect starts an attack path
    let a = graph.threat_by_uri("a").unwrap();
    assert!(!a.flags.initial_cause);
    assert!(a.flags.root_cause);
    assert!(!graph.misbehaviour_by_uri("next").unwrap().normal_op_effect);
    assert_eq!((result.initial_causes, result.root_causes), (1, 1));
}

fn normal_op_model() -> serde_json::Value {
    json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "xn", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [
            {"uri": "m_n", "asset": "host", "impact": "im1"},
            {"uri": "target", "asset": "host", "impact": "im4"},
        ],
        "threats": [
            {"uri": "n", "parent": "T.N", "entry_points": ["xn"], "effects": ["m_n"], "normal_operation": true},
            {"uri": "a", "parent": "T.A", "secondary_effect_conditions": ["m_n"], "effects": ["target"]},
        ],
    })
}

#[test]
fn shortest_path_keeps_only_the_closer_branch() {
    let (scales, graph, _) = propagate(diamond());

    let report = attack_engine_report(&graph, &scales, "target", false, false);
    let tree = &report.per_target["target"];
    let uris: Vec<&str> = tree.node_uris().collect();
    assert_eq!(uris, vec!["t_a", "target", "root"]);
    assert_eq!(tree.root_cause, "t_a");
    assert_eq!(tree.attack_mitigation_cs, "c_a");
    assert_eq!(tree.attack_mitigation_csg, "g_a");
    assert_eq!(tree.links.len(), 2);
    assert!(tree
        .links
        .iter()
        .any(|l| l.source == "root" && l.target == "t_a" && l.kind == LinkKind::Enables));
    assert!(tree
        .links
        .iter()
        .any(|l| l.source == "t_a" && l.target == "target" && l.kind == LinkKind::Causes));
    assert_eq!(tree.twas[0].target_distance, 2);
    assert_eq!(tree.misbehaviours[0].min_distance, 2);
}

#[test]
fn all_paths_keeps_every_branch() {
    let (scales, graph, _) = propagate(diamond());

    let report = attack_engine_report(&graph, &scales, "target", true, false);
    let tree = &report.per_target["target"];
    let threats: Vec<&str> = tree.threats.iter().map(|t| t.uri.as_str()).collect();
    assert_eq!(threats, vec!["t_a", "t_b", "t_c"]);
    assert!(tree.contains("m_c"));
    assert_eq!(tree.root_cause, "(t_a | t_b)");
    // the B-C branch has no blocking strategy, so the target cannot be mitigated
    assert_eq!(tree.attack_mitigation_cs, "FALSE");
    let target = &tree.misbehaviours.iter().find(|m| m.uri == "target").unwrap();
    assert_eq!((target.min_distance, target.max_distance), (2, 4));
    assert_eq!(tree.twas[0].target_distance, 4);
}

#[test]
fn cycles_terminate_with_loopback() {
    let (scales, graph, _) = propagate(loop_model());
    assert_eq!(caused_by(&graph, "t2"), vec!["m"]);

    for all_paths in [true, false] {
        let report = attack_engine_report(&graph, &scales, "m", all_paths, false);
        let tree = &report.per_target["m"];
        let threats: Vec<&str> = tree.threats.iter().map(|t| t.uri.as_str()).collect();
        assert_eq!(threats, vec!["t1"]);
        assert!(!tree.contains("t2"));
        assert_eq!(tree.root_cause, "t1");
        assert_eq!(report.failed.get("t2"), Some(&vec!["m".to_string()]));
    }
}

#[test]
fn mitigation_names_the_control_a_trigger_role_consults() {
    let (scales, graph, _) = propagate(json!({
        "assets": [{"uri": "host"}],
        "trustworthiness": [{"uri": "root", "asset": "host", "asserted": "tw1"}],
        "misbehaviours": [{"uri": "target", "asset": "host", "impact": "im4"}],
        "threats": [
            {"uri": "t", "parent": "T", "entry_points": ["root"], "effects": ["target"], "blocked_by": ["g"]},
        ],
        "controls": [
            {"uri": "c", "asset": "host", "has_min": "c_min", "has_max": "c_max"},
            {"uri": "c_min", "asset": "host", "min_of": "c"},
            {"uri": "c_max", "asset": "host", "max_of": "c"},
        ],
        "control_strategies": [
            {"uri": "g", "parent": "CSG", "mandatory": ["c"], "trigger_role": "sufficient"},
        ],
    }));
    assert!(!graph.strategy_by_uri("g").unwrap().enabled);

    let report = attack_engine_report(&graph, &scales, "target", false, false);
    let tree = &report.per_target["target"];
    assert_eq!(tree.attack_mitigation_cs, "c_max");
    assert_eq!(tree.attack_mitigation_csg, "g");
}

#[test]
fn normal_operation_causes_are_followed_only_on_request() {
    let (scales, graph, _) = propagate(normal_op_model());

    let report = attack_engine_report(&graph, &scales, "target", false, false);
    let tree = &report.per_target["target"];
    assert_eq!(tree.node_uris().collect::<Vec<_>>(), vec!["a", "target"]);
    assert_eq!(tree.root_cause, "a");

    let report = attack_engine_report(&graph, &scales, "target", false, true);
    let tree = &report.per_target["target"];
    assert_eq!(tree.node_uris().collect::<Vec<_>>(), vec!["n", "a", "m_n", "target", "xn"]);
    assert!(tree.threats.iter().any(|t| t.uri == "n" && t.normal_operation && t.initial_cause));
}

#[test]
fn bad_targets_are_validation_errors() {
    let (scales, graph, _) = propagate(diamond());
    let engine = AttackPathEngine::new(&graph, &scales, AttackPathConfig::default());

    let err = engine
        .build_tree(&["target".to_string(), "nope".to_string()], RiskMode::Current, false, false)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTarget { ref uri } if uri == "nope"));
    assert!(err.is_validation());

    let err = engine
        .build_tree(&["t_a".to_string()], RiskMode::Current, false, false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTarget { .. }));
}

#[test]
fn configured_targets_drive_run() {
    let (scales, graph, _) = propagate(diamond());
    let config = AttackPathConfig {
        targets: vec!["target".to_string()],
        ..AttackPathConfig::default()
    };
    let report = AttackPathEngine::new(&graph, &scales, config).run(RiskMode::Current).unwrap();
    assert!(!report.all_paths);
    assert_eq!(report.per_target.len(), 1);
}

#[test]
fn run_store_round_trip() {
    let doc = document(5, diamond());
    let digest = doc.digest().unwrap();
    let (scales, mut graph) = doc.build().unwrap();
    let result = RiskEngine::new(RiskConfig::default()).run(&mut graph, &scales).unwrap();
    let report = attack_engine_report(&graph, &scales, "target", false, false);

    let dir = tempfile::tempdir().unwrap();
    let mut store = RunStore::open(&dir.path().join("runs.db")).unwrap();
    let record = RunRecord::new(&result, &scales, digest.clone(), graph.inferred_snapshot(&scales), report.per_target);
    store.record_run(&record).unwrap();

    let latest = store.latest_for_model(&digest).unwrap().unwrap();
    assert_eq!(latest, record);
    assert_eq!(latest.overall_risk, "rk4");
    assert_eq!(store.attack_trees(&result.run_id).unwrap()["target"].root_cause, "t_a");
}
