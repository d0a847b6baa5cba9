//! Purpose: Exercise the playground pipeline through the public API.
//! Exports: None (integration test module).
//! Role: Cover the documented scenarios with the built-in CertLogic engine and an injected engine.
//! Invariants: Only `certlogic_fiddle::api` is used; no internal modules.

use std::cell::Cell;

use certlogic_fiddle::api::{
    CertLogic, Engine, EvaluationFault, EvaluationOutcome, Pipeline, ShareState, ValidationError,
    decode, encode, parse,
};
use serde_json::{Value, json};

#[test]
fn default_buffers_evaluate_to_null() {
    let pipeline = Pipeline::new(CertLogic);
    let derivation = pipeline.derive();
    assert!(derivation.validation_errors.is_empty());
    assert_eq!(derivation.outcome, EvaluationOutcome::Success(Value::Null));
}

#[test]
fn malformed_data_is_reported() {
    let pipeline = Pipeline::with_buffers(CertLogic, "{\"var\":\"\"}", "not-json");
    assert!(matches!(
        pipeline.outcome(),
        EvaluationOutcome::DataMalformed(_)
    ));
}

#[test]
fn malformed_expression_becomes_single_validation_error() {
    let pipeline = Pipeline::with_buffers(CertLogic, "{not valid json", "{}");
    let errors = pipeline.validation_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].expr, json!("{not valid json"));
    assert!(errors[0].message.starts_with("Could not parse expression text: "));
    assert_eq!(pipeline.outcome(), EvaluationOutcome::ExpressionInvalid);
}

#[test]
fn incompatible_operands_fault_at_runtime() {
    let pipeline = Pipeline::with_buffers(CertLogic, "{\"+\": [\"a\", 1]}", "{}");
    assert!(pipeline.validation_errors().is_empty());
    match pipeline.outcome() {
        EvaluationOutcome::RuntimeFault(message) => assert!(!message.is_empty()),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn share_round_trip_ignores_whitespace() {
    let query = encode("{ \"var\" : \"a\" }", "{\n  \"a\": 1\n}").expect("encode");
    let ShareState {
        expression_text,
        data_text,
    } = decode(&query);
    assert_eq!(parse(&expression_text).value(), Some(&json!({"var": "a"})));
    assert_eq!(parse(&data_text).value(), Some(&json!({"a": 1})));
}

#[test]
fn edits_take_effect_on_next_read() {
    let mut pipeline = Pipeline::new(CertLogic);
    pipeline.set_data_text("{\"\": \"whole\"}");
    assert_eq!(pipeline.outcome(), EvaluationOutcome::Success(json!("whole")));
    pipeline.set_expression_text("{\"dccDateOfBirth\": [\"2004-02\"]}");
    assert_eq!(
        pipeline.outcome(),
        EvaluationOutcome::Success(json!("2004-02-29T00:00:00.000Z"))
    );
}

/// Counts evaluations and accepts only the literal `"ok"`.
struct CountingEngine {
    evaluations: Cell<usize>,
}

impl Engine for CountingEngine {
    fn validate_expression(&self, expr: &Value) -> Vec<ValidationError> {
        if expr == &json!("ok") {
            Vec::new()
        } else {
            vec![ValidationError::new(expr, "only \"ok\" is accepted")]
        }
    }

    fn evaluate_expression(&self, _expr: &Value, data: &Value) -> Result<Value, EvaluationFault> {
        self.evaluations.set(self.evaluations.get() + 1);
        Ok(data.clone())
    }
}

#[test]
fn injected_engine_is_never_asked_to_evaluate_invalid_expressions() {
    let engine = CountingEngine {
        evaluations: Cell::new(0),
    };
    let invalid = Pipeline::with_buffers(&engine, "\"nope\"", "[1]");
    assert_eq!(invalid.outcome(), EvaluationOutcome::ExpressionInvalid);
    let both_bad = Pipeline::with_buffers(&engine, "\"nope\"", "[1");
    assert!(matches!(
        both_bad.outcome(),
        EvaluationOutcome::DataMalformed(_)
    ));
    assert_eq!(engine.evaluations.get(), 0);

    let valid = Pipeline::with_buffers(&engine, "\"ok\"", "[1]");
    assert_eq!(valid.outcome(), EvaluationOutcome::Success(json!([1])));
    assert_eq!(valid.outcome(), valid.outcome());
    assert_eq!(engine.evaluations.get(), 3);
}
