//! Purpose: Shared JSON envelopes for derivations and share links.
//! Exports: `derivation_json`, `share_json`, `buffers_json`.
//! Role: Keep the outcome envelope shape identical across the CLI and the HTTP server.
//! Invariants: Stable key names; `share` is present only when both buffers parse.
//! Invariants: Non-success outcomes always carry a human-readable `message`.
//! Invariants: `data_accesses` is empty whenever `validation_errors` is not.

use certlogic_fiddle::api::{Buffer, Derivation, EvaluationOutcome, ParseOutcome, ShareState};
use serde_json::{Map, Value, json};
use url::Url;

pub(crate) fn derivation_json(derivation: &Derivation, share: Option<&Url>) -> Value {
    let mut map = Map::new();
    map.insert(
        "expression".to_string(),
        parse_json(&derivation.expression, Buffer::Expression),
    );
    map.insert(
        "validation_errors".to_string(),
        Value::Array(
            derivation
                .validation_errors
                .iter()
                .map(|error| json!({ "expr": error.expr, "message": error.message }))
                .collect(),
        ),
    );
    map.insert(
        "data".to_string(),
        parse_json(&derivation.data, Buffer::Data),
    );
    map.insert("evaluation".to_string(), evaluation_json(&derivation.outcome));
    map.insert(
        "data_accesses".to_string(),
        Value::Array(
            derivation
                .data_accesses
                .iter()
                .map(|access| json!({ "path": access.path, "context": access.context }))
                .collect(),
        ),
    );
    if let Some(url) = share {
        map.insert("share".to_string(), share_json(url));
    }
    Value::Object(map)
}

pub(crate) fn share_json(url: &Url) -> Value {
    json!({
        "query": url.query().unwrap_or(""),
        "url": url.as_str(),
    })
}

pub(crate) fn buffers_json(state: &ShareState) -> Value {
    json!({
        "expr": state.expression_text,
        "data": state.data_text,
    })
}

fn parse_json(outcome: &ParseOutcome, buffer: Buffer) -> Value {
    match outcome {
        ParseOutcome::Parsed(_) => json!({ "parsed": true }),
        ParseOutcome::MalformedText(malformed) => {
            let mut error = Map::new();
            error.insert("category".to_string(), json!(malformed.category.label()));
            error.insert("message".to_string(), json!(malformed.message));
            if malformed.line > 0 {
                error.insert("line".to_string(), json!(malformed.line));
                error.insert("column".to_string(), json!(malformed.column));
            }
            error.insert("hint".to_string(), json!(malformed.hint(buffer.label())));
            json!({ "parsed": false, "error": error })
        }
    }
}

fn evaluation_json(outcome: &EvaluationOutcome) -> Value {
    let mut map = Map::new();
    map.insert("status".to_string(), json!(outcome.status()));
    match outcome {
        EvaluationOutcome::Success(value) => {
            map.insert("value".to_string(), value.clone());
        }
        EvaluationOutcome::DataMalformed(_)
        | EvaluationOutcome::ExpressionInvalid
        | EvaluationOutcome::RuntimeFault(_) => {
            if let Some(message) = outcome.explanation() {
                map.insert("message".to_string(), json!(message));
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::{buffers_json, derivation_json};
    use certlogic_fiddle::api::{CertLogic, ShareState, derive};
    use serde_json::{Value, json};
    use url::Url;

    #[test]
    fn success_envelope_carries_value_and_share() {
        let derivation = derive(&CertLogic, "{\"var\":\"a\"}", "{\"a\":1}");
        let url = Url::parse("http://127.0.0.1:9700/?expr=x&data=y").expect("url");
        let value = derivation_json(&derivation, Some(&url));
        assert_eq!(value["expression"], json!({"parsed": true}));
        assert_eq!(value["validation_errors"], json!([]));
        assert_eq!(value["evaluation"], json!({"status": "success", "value": 1}));
        assert_eq!(value["share"]["query"], json!("expr=x&data=y"));
        assert_eq!(
            value["data_accesses"],
            json!([{"path": "a", "context": {"var": "a"}}])
        );
    }

    #[test]
    fn malformed_data_envelope_has_message_and_no_share() {
        let derivation = derive(&CertLogic, "{\"var\":\"a\"}", "not-json");
        let value = derivation_json(&derivation, None);
        assert_eq!(value["data"]["parsed"], json!(false));
        assert_eq!(value["data"]["error"]["category"], json!("syntax"));
        assert_eq!(value["data"]["error"]["line"], json!(1));
        assert!(
            value["data"]["error"]["hint"]
                .as_str()
                .is_some_and(|h| h.starts_with("parse category: syntax; context: data; at line 1"))
        );
        assert_eq!(value["evaluation"]["status"], json!("data-malformed"));
        assert!(
            value["evaluation"]["message"]
                .as_str()
                .is_some_and(|m| m.starts_with("Could not parse data text as JSON:"))
        );
        assert!(value.get("share").is_none());
    }

    #[test]
    fn invalid_expression_envelope_lists_errors() {
        let derivation = derive(&CertLogic, "{\"if\": [true]}", "{}");
        let value = derivation_json(&derivation, None);
        let errors = value["validation_errors"].as_array().expect("errors");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["expr"], json!({"if": [true]}));
        assert_eq!(value["evaluation"]["status"], json!("expression-invalid"));
        assert_eq!(value["evaluation"].get("value"), None::<&Value>);
        assert_eq!(value["data_accesses"], json!([]));
    }

    #[test]
    fn buffers_envelope_uses_param_names() {
        let state = ShareState {
            expression_text: "{}".into(),
            data_text: "[]".into(),
        };
        assert_eq!(buffers_json(&state), json!({"expr": "{}", "data": "[]"}));
    }
}
