//! Purpose: Own the expression and data buffers and derive the evaluation outcome from them.
//! Exports: `Engine`, `Pipeline`, `derive`.
//! Role: The state machine of the playground: parse -> validate -> parse -> evaluate.
//! Invariants: Setters store text verbatim; no parsing happens at edit time.
//! Invariants: Every read recomputes from scratch; there is no cache to invalidate.
//! Invariants: A malformed data buffer is reported before an invalid expression.
//! Invariants: The evaluator only ever sees expressions with zero validation errors.
use serde_json::Value;
use url::Url;

use super::error::Error;
use super::outcome::{DataAccess, Derivation, EvaluationFault, EvaluationOutcome, ValidationError};
use super::safe::{safe_data_accesses, safe_evaluate, safe_parse};
use super::share::{self, ShareState};
use crate::json::parse::{self, MalformedText, ParseOutcome};

/// The three collaborators the pipeline drives.
///
/// Implementations are pure: no I/O and no state that changes between calls.
pub trait Engine {
    fn parse_text(&self, text: &str) -> Result<Value, MalformedText> {
        parse::parse(text).into_result()
    }

    fn validate_expression(&self, expr: &Value) -> Vec<ValidationError>;

    fn evaluate_expression(&self, expr: &Value, data: &Value) -> Result<Value, EvaluationFault>;

    /// Data paths a valid expression may read. Engines without the analysis report none.
    fn data_accesses(&self, _expr: &Value) -> Vec<DataAccess> {
        Vec::new()
    }
}

impl<E: Engine + ?Sized> Engine for &E {
    fn parse_text(&self, text: &str) -> Result<Value, MalformedText> {
        (**self).parse_text(text)
    }

    fn validate_expression(&self, expr: &Value) -> Vec<ValidationError> {
        (**self).validate_expression(expr)
    }

    fn evaluate_expression(&self, expr: &Value, data: &Value) -> Result<Value, EvaluationFault> {
        (**self).evaluate_expression(expr, data)
    }

    fn data_accesses(&self, expr: &Value) -> Vec<DataAccess> {
        (**self).data_accesses(expr)
    }
}

pub fn derive<E: Engine + ?Sized>(
    engine: &E,
    expression_text: &str,
    data_text: &str,
) -> Derivation {
    let expression = safe_parse(engine, expression_text);
    let validation_errors = match &expression {
        ParseOutcome::Parsed(expr) => engine.validate_expression(expr),
        ParseOutcome::MalformedText(malformed) => vec![ValidationError {
            expr: Value::String(expression_text.to_string()),
            message: format!("Could not parse expression text: {}", malformed.message),
        }],
    };

    let data = safe_parse(engine, data_text);
    let outcome = match (&data, &expression) {
        (ParseOutcome::MalformedText(malformed), _) => {
            EvaluationOutcome::DataMalformed(malformed.message.clone())
        }
        (ParseOutcome::Parsed(_), _) if !validation_errors.is_empty() => {
            EvaluationOutcome::ExpressionInvalid
        }
        (ParseOutcome::Parsed(data), ParseOutcome::Parsed(expr)) => {
            safe_evaluate(engine, expr, data)
        }
        // A malformed expression always carries one synthesized validation error.
        (ParseOutcome::Parsed(_), ParseOutcome::MalformedText(_)) => {
            EvaluationOutcome::ExpressionInvalid
        }
    };

    let data_accesses = match &expression {
        ParseOutcome::Parsed(expr) if validation_errors.is_empty() => {
            safe_data_accesses(engine, expr)
        }
        _ => Vec::new(),
    };

    tracing::debug!(
        expression_parsed = expression.is_parsed(),
        validation_errors = validation_errors.len(),
        data_parsed = data.is_parsed(),
        outcome = outcome.status(),
        "derived evaluation outcome"
    );

    Derivation {
        expression,
        validation_errors,
        data,
        outcome,
        data_accesses,
    }
}

#[derive(Clone, Debug)]
pub struct Pipeline<E> {
    engine: E,
    expression_text: String,
    data_text: String,
}

impl<E: Engine> Pipeline<E> {
    /// Starts from the default buffers.
    pub fn new(engine: E) -> Self {
        Self::from_share_state(engine, ShareState::default())
    }

    pub fn with_buffers(
        engine: E,
        expression_text: impl Into<String>,
        data_text: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            expression_text: expression_text.into(),
            data_text: data_text.into(),
        }
    }

    pub fn from_share_state(engine: E, state: ShareState) -> Self {
        Self::with_buffers(engine, state.expression_text, state.data_text)
    }

    pub fn from_query(engine: E, query: &str) -> Self {
        Self::from_share_state(engine, share::decode(query))
    }

    pub fn from_url(engine: E, url: &Url) -> Self {
        Self::from_share_state(engine, share::decode_url(url))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn expression_text(&self) -> &str {
        &self.expression_text
    }

    pub fn data_text(&self) -> &str {
        &self.data_text
    }

    pub fn set_expression_text(&mut self, text: impl Into<String>) {
        self.expression_text = text.into();
    }

    pub fn set_data_text(&mut self, text: impl Into<String>) {
        self.data_text = text.into();
    }

    pub fn share_state(&self) -> ShareState {
        ShareState {
            expression_text: self.expression_text.clone(),
            data_text: self.data_text.clone(),
        }
    }

    pub fn derive(&self) -> Derivation {
        derive(&self.engine, &self.expression_text, &self.data_text)
    }

    pub fn validation_errors(&self) -> Vec<ValidationError> {
        self.derive().validation_errors
    }

    pub fn outcome(&self) -> EvaluationOutcome {
        self.derive().outcome
    }

    /// Buffers are parsed by the engine, so sharing agrees with `Derivation::is_shareable`.
    pub fn share_query(&self) -> Result<String, Error> {
        share::encode_parsed(
            safe_parse(&self.engine, &self.expression_text),
            safe_parse(&self.engine, &self.data_text),
        )
    }

    pub fn share_url(&self, base: &Url) -> Result<Url, Error> {
        share::share_url_parsed(
            base,
            safe_parse(&self.engine, &self.expression_text),
            safe_parse(&self.engine, &self.data_text),
        )
    }
}
