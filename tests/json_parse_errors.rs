//! Purpose: Regression coverage for parse-failure category mapping.
//! Exports: Integration tests only.
//! Role: Verify stable category labels used by malformed-text diagnostics.
//! Invariants: Category mapping remains deterministic for representative errors.
//! Invariants: Tests avoid payload leakage; assertions target category/hint text only.
//! Notes: Uses source include to exercise internal helper logic without widening API surface.

#[allow(dead_code)]
#[path = "../src/json/parse.rs"]
mod parse;

use parse::{MalformedText, ParseFailureCategory, ParseOutcome};
use serde_json::Value;

#[test]
fn category_mapping_handles_syntax_eof_and_data_errors() {
    let syntax_err = parse::from_str::<Value>(r#"{"a":}"#).unwrap_err();
    assert_eq!(
        parse::categorize_error(&syntax_err),
        ParseFailureCategory::Syntax
    );

    let eof_err = parse::from_str::<Value>(r#"{"a":[1,2"#).unwrap_err();
    assert_eq!(parse::categorize_error(&eof_err), ParseFailureCategory::Eof);

    let data_err = parse::from_str::<u8>("300").unwrap_err();
    assert_eq!(parse::categorize_error(&data_err), ParseFailureCategory::Data);
}

#[test]
fn deep_nesting_maps_to_depth_limit() {
    let deep = format!("{}{}", "[".repeat(200), "]".repeat(200));
    let err = parse::from_str::<Value>(&deep).unwrap_err();
    assert_eq!(
        parse::categorize_error(&err),
        ParseFailureCategory::DepthLimit
    );
    assert_eq!(
        parse::categorize_message("recursion limit exceeded while parsing"),
        ParseFailureCategory::DepthLimit
    );
}

#[test]
fn hint_contains_category_and_context() {
    let err = parse::from_str::<Value>("{\n  \"a\": nope\n}").unwrap_err();
    let hint = MalformedText::from_error(&err).hint("data buffer");
    assert!(hint.contains("parse category: syntax"));
    assert!(hint.contains("context: data buffer"));
    assert!(hint.contains("at line 2"));

    let eof = MalformedText::from_error(&parse::from_str::<Value>("").unwrap_err());
    assert_eq!(
        eof.hint("expression"),
        "parse category: eof; context: expression; at line 1 column 0"
    );
}

#[test]
fn unknown_category_fallback_is_stable() {
    assert_eq!(
        parse::categorize_message("opaque parser issue"),
        ParseFailureCategory::Unknown
    );
    assert_eq!(ParseFailureCategory::Unknown.label(), "unknown");
}

#[test]
fn malformed_outcome_keeps_serde_message() {
    match parse::parse("") {
        ParseOutcome::MalformedText(malformed) => {
            assert_eq!(malformed.category, ParseFailureCategory::Eof);
            assert_eq!(
                malformed.message,
                "EOF while parsing a value at line 1 column 0"
            );
        }
        ParseOutcome::Parsed(value) => panic!("unexpected parse: {value}"),
    }
}
