use super::*;

#[test]
fn defaults_match_documented_durations() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.timing.default_ms, 1000.0);
    assert!(cfg.timing.one_touch_ms < cfg.timing.default_ms);
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_keeps_other_defaults() {
    let cfg = EngineConfig::from_json_str(r#"{ "timing": { "one_touch_ms": 300 } }"#).unwrap();
    assert_eq!(cfg.timing.one_touch_ms, 300.0);
    assert_eq!(cfg.timing.default_ms, 1000.0);
    assert!(cfg.steps.infer_chains);
    assert_eq!(cfg.one_touch.max_step_gap, 1);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(EngineConfig::from_json_str(r#"{ "timing": { "default_ms": 0 } }"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{ "ghosts": { "min_alpha": 2.0 } }"#).is_err());
    assert!(EngineConfig::from_json_str("not json").is_err());
}
