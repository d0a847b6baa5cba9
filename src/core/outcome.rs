//! Purpose: Value types derived from the two buffers on every read.
//! Exports: `Buffer`, `ValidationError`, `DataAccess`, `EvaluationOutcome`, `EvaluationFault`,
//! Exports: `Derivation`.
//! Role: Tagged results shared by the pipeline, the share codec, and output envelopes.
//! Invariants: Exactly one `EvaluationOutcome` variant holds for a given buffer pair.
//! Invariants: None of these types is ever cached; they are rebuilt from text on each read.
use std::fmt;

use serde_json::Value;

use crate::json::parse::ParseOutcome;

/// One of the two user-editable text buffers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Buffer {
    Expression,
    Data,
}

impl Buffer {
    /// Query-string parameter carrying this buffer in a shareable link.
    pub fn param(self) -> &'static str {
        match self {
            Self::Expression => "expr",
            Self::Data => "data",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::Data => "data",
        }
    }
}

/// A complaint about the shape of an expression, independent of any data.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    pub expr: Value,
    pub message: String,
}

impl ValidationError {
    pub fn new(expr: &Value, message: impl Into<String>) -> Self {
        Self {
            expr: expr.clone(),
            message: message.into(),
        }
    }
}

/// A data path an expression may read, with the operation that reads it.
#[derive(Clone, Debug, PartialEq)]
pub struct DataAccess {
    pub path: String,
    pub context: Value,
}

/// Error raised by an evaluator while running a well-formed expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvaluationFault {
    message: String,
}

impl EvaluationFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EvaluationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvaluationFault {}

#[derive(Clone, Debug, PartialEq)]
pub enum EvaluationOutcome {
    Success(Value),
    DataMalformed(String),
    /// Evaluation was skipped because the expression did not validate.
    ExpressionInvalid,
    RuntimeFault(String),
}

impl EvaluationOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::DataMalformed(_) => "data-malformed",
            Self::ExpressionInvalid => "expression-invalid",
            Self::RuntimeFault(_) => "runtime-fault",
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Human-readable explanation for every non-success variant.
    pub fn explanation(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::DataMalformed(message) => {
                Some(format!("Could not parse data text as JSON: {message}."))
            }
            Self::ExpressionInvalid => {
                Some("(Did not run evaluation because expression is not valid.)".to_string())
            }
            Self::RuntimeFault(message) => {
                Some(format!("Error occurred during evaluation: {message}."))
            }
        }
    }
}

/// Everything one read of the pipeline produces.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivation {
    pub expression: ParseOutcome,
    pub validation_errors: Vec<ValidationError>,
    pub data: ParseOutcome,
    pub outcome: EvaluationOutcome,
    /// Empty unless the expression validated.
    pub data_accesses: Vec<DataAccess>,
}

impl Derivation {
    pub fn expression_is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }

    /// Both buffers parse, so a shareable link reproduces what is on screen.
    pub fn is_shareable(&self) -> bool {
        self.expression.is_parsed() && self.data.is_parsed()
    }
}
