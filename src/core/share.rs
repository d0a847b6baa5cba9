//! Purpose: Encode the buffer pair into a shareable query string and restore it again.
//! Exports: `ShareState`, `decode`, `decode_url`, `encode`, `encode_parsed`, `share_url`,
//! Exports: `share_url_parsed`, `default_expression_text`, `default_data_text`.
//! Role: The only place that knows the `expr`/`data` parameter names and default buffers.
//! Invariants: `decode` never validates; parameter values are used verbatim.
//! Invariants: `encode` fails closed when either buffer is malformed, naming that buffer.
//! Invariants: decode(encode(a, b)) parses to the same values as `a` and `b`.
use serde_json::{Value, json};
use url::Url;
use url::form_urlencoded;

use super::error::{Error, ErrorKind};
use super::outcome::Buffer;
use crate::json::parse::{self, ParseOutcome};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareState {
    pub expression_text: String,
    pub data_text: String,
}

impl Default for ShareState {
    fn default() -> Self {
        Self {
            expression_text: default_expression_text(),
            data_text: default_data_text(),
        }
    }
}

/// A variable reference to the empty key.
pub fn default_expression_text() -> String {
    parse::pretty(&json!({ "var": "" }))
}

pub fn default_data_text() -> String {
    parse::pretty(&json!({}))
}

/// Accepts a bare query with or without the leading `?`.
pub fn decode(query: &str) -> ShareState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut expression_text = None;
    let mut data_text = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = if key == Buffer::Expression.param() {
            &mut expression_text
        } else if key == Buffer::Data.param() {
            &mut data_text
        } else {
            continue;
        };
        // First occurrence wins, like URLSearchParams.get.
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let state = ShareState {
        expression_text: expression_text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(default_expression_text),
        data_text: data_text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(default_data_text),
    };
    tracing::debug!(
        expr_len = state.expression_text.len(),
        data_len = state.data_text.len(),
        "decoded share state"
    );
    state
}

pub fn decode_url(url: &Url) -> ShareState {
    decode(url.query().unwrap_or(""))
}

pub fn encode(expression_text: &str, data_text: &str) -> Result<String, Error> {
    encode_parsed(parse::parse(expression_text), parse::parse(data_text))
}

/// Encodes buffers already run through a parser, such as an engine's `parse_text`.
pub fn encode_parsed(expression: ParseOutcome, data: ParseOutcome) -> Result<String, Error> {
    let expr = parsed_for_share(Buffer::Expression, expression)?;
    let data = parsed_for_share(Buffer::Data, data)?;
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(Buffer::Expression.param(), &parse::minify(&expr))
        .append_pair(Buffer::Data.param(), &parse::minify(&data))
        .finish();
    Ok(query)
}

/// `base` with its query replaced by the encoded buffer pair.
pub fn share_url(base: &Url, expression_text: &str, data_text: &str) -> Result<Url, Error> {
    share_url_parsed(base, parse::parse(expression_text), parse::parse(data_text))
}

pub fn share_url_parsed(
    base: &Url,
    expression: ParseOutcome,
    data: ParseOutcome,
) -> Result<Url, Error> {
    let query = encode_parsed(expression, data)?;
    let mut url = base.clone();
    url.set_query(Some(&query));
    url.set_fragment(None);
    Ok(url)
}

fn parsed_for_share(buffer: Buffer, outcome: ParseOutcome) -> Result<Value, Error> {
    match outcome {
        ParseOutcome::Parsed(value) => Ok(value),
        ParseOutcome::MalformedText(malformed) => Err(Error::new(ErrorKind::Malformed)
            .with_message(format!(
                "cannot share: {} text is not valid JSON",
                buffer.label()
            ))
            .with_hint(format!(
                "Fix the {} buffer ({}) before creating a shareable link.",
                buffer.label(),
                malformed.hint(buffer.label())
            ))
            .with_buffer(buffer)
            .with_source(malformed)),
    }
}
