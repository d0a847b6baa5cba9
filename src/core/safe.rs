//! Purpose: Fault barriers around the injected parser and evaluator.
//! Exports: `safe_parse`, `safe_evaluate`, `safe_data_accesses`.
//! Role: Convert every collaborator failure (error result or panic) into a derived value.
//! Invariants: Neither function returns `Err` or unwinds past its caller.
//! Invariants: Caught panics are logged at `warn` and reported with their payload text.
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;

use super::outcome::{DataAccess, EvaluationOutcome};
use super::pipeline::Engine;
use crate::json::parse::{MalformedText, ParseFailureCategory, ParseOutcome};

pub fn safe_parse<E: Engine + ?Sized>(engine: &E, text: &str) -> ParseOutcome {
    match catch_unwind(AssertUnwindSafe(|| engine.parse_text(text))) {
        Ok(result) => ParseOutcome::from(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "parser panicked");
            ParseOutcome::MalformedText(MalformedText::unpositioned(
                ParseFailureCategory::Unknown,
                message,
            ))
        }
    }
}

/// Only ever called with an expression the validator accepted.
pub fn safe_evaluate<E: Engine + ?Sized>(
    engine: &E,
    expr: &Value,
    data: &Value,
) -> EvaluationOutcome {
    match catch_unwind(AssertUnwindSafe(|| engine.evaluate_expression(expr, data))) {
        Ok(Ok(value)) => EvaluationOutcome::Success(value),
        Ok(Err(fault)) => EvaluationOutcome::RuntimeFault(fault.message().to_string()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "evaluator panicked");
            EvaluationOutcome::RuntimeFault(message)
        }
    }
}

/// A panicking analysis reports no accesses; it never changes the outcome.
pub fn safe_data_accesses<E: Engine + ?Sized>(engine: &E, expr: &Value) -> Vec<DataAccess> {
    match catch_unwind(AssertUnwindSafe(|| engine.data_accesses(expr))) {
        Ok(accesses) => accesses,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, "data access analysis panicked");
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "engine panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{safe_data_accesses, safe_evaluate, safe_parse};
    use crate::core::outcome::{DataAccess, EvaluationFault, EvaluationOutcome, ValidationError};
    use crate::core::pipeline::Engine;
    use crate::json::parse::{MalformedText, ParseOutcome};
    use serde_json::{Value, json};

    struct Faulty;

    impl Engine for Faulty {
        fn validate_expression(&self, _expr: &Value) -> Vec<ValidationError> {
            Vec::new()
        }

        fn evaluate_expression(
            &self,
            expr: &Value,
            _data: &Value,
        ) -> Result<Value, EvaluationFault> {
            match expr.as_str() {
                Some("panic") => panic!("stack smashed"),
                Some("fail") => Err(EvaluationFault::new("type mismatch")),
                _ => Ok(expr.clone()),
            }
        }

        fn data_accesses(&self, expr: &Value) -> Vec<DataAccess> {
            match expr.as_str() {
                Some("panic") => panic!("walker lost"),
                _ => vec![DataAccess {
                    path: "a".into(),
                    context: expr.clone(),
                }],
            }
        }
    }

    struct PanickingParser;

    impl Engine for PanickingParser {
        fn parse_text(&self, _text: &str) -> Result<Value, MalformedText> {
            panic!("parser exploded")
        }

        fn validate_expression(&self, _expr: &Value) -> Vec<ValidationError> {
            Vec::new()
        }

        fn evaluate_expression(
            &self,
            _expr: &Value,
            _data: &Value,
        ) -> Result<Value, EvaluationFault> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn evaluator_error_becomes_runtime_fault() {
        let outcome = safe_evaluate(&Faulty, &json!("fail"), &json!({}));
        assert_eq!(outcome, EvaluationOutcome::RuntimeFault("type mismatch".into()));
    }

    #[test]
    fn evaluator_panic_becomes_runtime_fault() {
        let outcome = safe_evaluate(&Faulty, &json!("panic"), &json!({}));
        assert_eq!(outcome, EvaluationOutcome::RuntimeFault("stack smashed".into()));
    }

    #[test]
    fn evaluator_success_passes_value_through() {
        let outcome = safe_evaluate(&Faulty, &json!("ok"), &json!({}));
        assert_eq!(outcome, EvaluationOutcome::Success(json!("ok")));
    }

    #[test]
    fn parser_panic_becomes_malformed_text() {
        let outcome = safe_parse(&PanickingParser, "{}");
        match outcome {
            ParseOutcome::MalformedText(malformed) => {
                assert_eq!(malformed.message, "parser exploded");
            }
            ParseOutcome::Parsed(value) => panic!("unexpected parse: {value}"),
        }
    }

    #[test]
    fn data_access_panic_reports_nothing() {
        assert!(safe_data_accesses(&Faulty, &json!("panic")).is_empty());
        assert_eq!(safe_data_accesses(&Faulty, &json!("ok")).len(), 1);
    }
}
