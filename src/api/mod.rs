//! Purpose: Define the stable public Rust API boundary for the fiddle.
//! Exports: Pipeline, engine trait, derived outcome types, share codec, errors.
//! Role: Public, additive-only surface used by the CLI, the HTTP server, and tests.
//! Invariants: This module is the only public path to pipeline and codec internals.

pub use crate::certlogic::{
    CertLogic, SPECIFICATION_VERSION, data_accesses, evaluate, extract_from_uvci, validate_format,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::outcome::{
    Buffer, DataAccess, Derivation, EvaluationFault, EvaluationOutcome, ValidationError,
};
pub use crate::core::pipeline::{Engine, Pipeline, derive};
pub use crate::core::safe::{safe_data_accesses, safe_evaluate, safe_parse};
pub use crate::core::share::{
    self, ShareState, decode, decode_url, default_data_text, default_expression_text, encode,
    share_url,
};
pub use crate::json::parse::{
    MalformedText, ParseFailureCategory, ParseOutcome, minify, parse, pretty,
};
