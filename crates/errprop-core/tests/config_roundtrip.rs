use errprop_core::CalculusConfig;

#[test]
fn defaults_fill_missing_fields() {
    let config = CalculusConfig::from_json_str("{}").unwrap();
    assert_eq!(config, CalculusConfig::default());
    assert_eq!(config.error_stddevs, 2.0);
    assert_eq!(config.first_source_id, 1);
}

#[test]
fn explicit_fields_override_defaults() {
    let config = CalculusConfig::from_json_str(r#"{"error_stddevs": 1.0, "first_source_id": 100}"#)
        .unwrap();
    assert_eq!(config.error_stddevs, 1.0);
    assert_eq!(config.first_source_id, 100);
}

#[test]
fn invalid_values_are_rejected() {
    let err = CalculusConfig::from_json_str(r#"{"error_stddevs": -1.0}"#).unwrap_err();
    assert_eq!(err.info().code, "invalid-error-stddevs");
    let err = CalculusConfig::from_json_str(r#"{"first_source_id": 0}"#).unwrap_err();
    assert_eq!(err.info().code, "invalid-first-source-id");
    let err = CalculusConfig::from_json_str("not json").unwrap_err();
    assert_eq!(err.info().code, "config-parse");
}

#[test]
fn config_serializes_back() {
    let config = CalculusConfig::with_error_stddevs(3.0);
    let json = serde_json::to_string(&config).unwrap();
    let restored = CalculusConfig::from_json_str(&json).unwrap();
    assert_eq!(restored, config);
}
