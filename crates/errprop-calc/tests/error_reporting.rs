use errprop_calc::{CalculusConfig, NumArray, PropError, UncertaintyContext};
use serde_json::Value;

#[test]
fn complex_variance_error_serializes_with_family_and_hint() {
    let ctx = UncertaintyContext::default();
    let x = ctx.uncertain(1.0, 0.1).unwrap();
    let rotated = &x * &NumArray::from(errprop_calc::Complex64::new(0.0, 1.0));
    let err = rotated.stddev().unwrap_err();
    assert!(matches!(err, PropError::InvalidOperation(_)));

    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], Value::from("InvalidOperation"));
    assert_eq!(json["detail"]["code"], Value::from("complex-variance"));
    assert!(json["detail"]["hint"].is_string());

    let restored: PropError = serde_json::from_value(json).unwrap();
    assert_eq!(restored, err);
}

#[test]
fn shape_errors_carry_both_shapes() {
    let ctx = UncertaintyContext::default();
    let a = ctx.uncertain(vec![1.0, 2.0, 3.0], 0.1).unwrap();
    let err = a.broadcast_to(&[2]).unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], Value::from("ShapeMismatch"));
    assert!(json["detail"]["context"]["lhs"].is_string());
    assert!(json["detail"]["context"]["rhs"].is_string());
}

#[test]
fn context_built_from_json_config() {
    let config = CalculusConfig::from_json_str(r#"{"error_stddevs": 1.0, "first_source_id": 500}"#)
        .unwrap();
    let ctx = UncertaintyContext::new(config).unwrap();
    let value = ctx.provide(0.3).unwrap();
    assert!((value.stddev().unwrap().sum() - 0.3).abs() < 1e-15);
    let first = value.sources().into_iter().next();
    assert_eq!(first.map(|id| id.as_raw()), Some(500));

    let err = CalculusConfig::from_json_str(r#"{"error_stddevs": -1.0}"#).unwrap_err();
    assert!(matches!(err, PropError::Config(_)));
}
