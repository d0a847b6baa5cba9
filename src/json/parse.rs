//! Purpose: Turn raw buffer text into a JSON value or a described parse failure.
//! Exports: `parse`, `from_str`, `ParseOutcome`, `MalformedText`, `ParseFailureCategory`,
//! Exports: `categorize_error`, `categorize_message`, `pretty`, `minify`.
//! Role: The malformed-text boundary; nothing past this module sees a raw parser error.
//! Invariants: `parse` is total: every input yields `Parsed` or `MalformedText`.
//! Invariants: `pretty` uses a two-space indent; `minify` emits no insignificant whitespace.
//! Notes: Kept free of crate-internal imports so tests can include it by path.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::error::Category;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseFailureCategory {
    Syntax,
    Eof,
    Data,
    DepthLimit,
    Io,
    Unknown,
}

impl ParseFailureCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Eof => "eof",
            Self::Data => "data",
            Self::DepthLimit => "depth-limit",
            Self::Io => "io",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MalformedText {
    pub category: ParseFailureCategory,
    pub message: String,
    /// 1-based; 0 when the failure has no position.
    pub line: usize,
    pub column: usize,
}

impl MalformedText {
    pub fn from_error(err: &serde_json::Error) -> Self {
        Self {
            category: categorize_error(err),
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// Failure without a parser position, e.g. a panic inside a custom parser.
    pub fn unpositioned(category: ParseFailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            line: 0,
            column: 0,
        }
    }

    /// One-line diagnostic naming the category and the buffer it came from.
    pub fn hint(&self, context: &str) -> String {
        let mut hint = format!(
            "parse category: {}; context: {context}",
            self.category.label()
        );
        if self.line > 0 {
            hint.push_str(&format!("; at line {} column {}", self.line, self.column));
        }
        hint
    }
}

impl fmt::Display for MalformedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MalformedText {}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseOutcome {
    Parsed(Value),
    MalformedText(MalformedText),
}

impl ParseOutcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::MalformedText(_) => None,
        }
    }

    pub fn malformed(&self) -> Option<&MalformedText> {
        match self {
            Self::Parsed(_) => None,
            Self::MalformedText(malformed) => Some(malformed),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn into_result(self) -> Result<Value, MalformedText> {
        match self {
            Self::Parsed(value) => Ok(value),
            Self::MalformedText(malformed) => Err(malformed),
        }
    }
}

impl From<Result<Value, MalformedText>> for ParseOutcome {
    fn from(result: Result<Value, MalformedText>) -> Self {
        match result {
            Ok(value) => Self::Parsed(value),
            Err(malformed) => Self::MalformedText(malformed),
        }
    }
}

pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(input)
}

pub fn parse(text: &str) -> ParseOutcome {
    match from_str::<Value>(text) {
        Ok(value) => ParseOutcome::Parsed(value),
        Err(err) => ParseOutcome::MalformedText(MalformedText::from_error(&err)),
    }
}

pub fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    let by_message = categorize_message(&err.to_string());
    if by_message != ParseFailureCategory::Unknown {
        return by_message;
    }
    match err.classify() {
        Category::Syntax => ParseFailureCategory::Syntax,
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Data,
        Category::Io => ParseFailureCategory::Io,
    }
}

pub fn categorize_message(message: &str) -> ParseFailureCategory {
    let lower = message.to_ascii_lowercase();
    if lower.contains("recursion limit") {
        ParseFailureCategory::DepthLimit
    } else {
        ParseFailureCategory::Unknown
    }
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

pub fn minify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
