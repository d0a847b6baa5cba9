//! Purpose: Built-in CertLogic validator and evaluator.
//! Exports: `CertLogic`, `validate_format`, `evaluate`, `data_accesses`, `SPECIFICATION_VERSION`.
//! Role: Default `Engine` implementation plugged into the pipeline.
//! Invariants: Stateless; one value can serve any number of pipelines and threads.

mod accesses;
mod dates;
mod evaluate;
mod validate;
mod value;

use serde_json::Value;

use crate::core::outcome::{DataAccess, EvaluationFault, ValidationError};
use crate::core::pipeline::Engine;

pub use accesses::data_accesses;
pub use evaluate::{evaluate, extract_from_uvci};
pub use validate::validate_format;

/// CertLogic specification version the validator and evaluator follow.
pub const SPECIFICATION_VERSION: &str = "1.3.2";

#[derive(Clone, Copy, Debug, Default)]
pub struct CertLogic;

impl Engine for CertLogic {
    fn validate_expression(&self, expr: &Value) -> Vec<ValidationError> {
        validate_format(expr)
    }

    fn evaluate_expression(&self, expr: &Value, data: &Value) -> Result<Value, EvaluationFault> {
        evaluate(expr, data)
    }

    fn data_accesses(&self, expr: &Value) -> Vec<DataAccess> {
        data_accesses(expr)
    }
}
