//! Purpose: Check that a JSON value is a well-formed CertLogic expression.
//! Exports: `validate_format`.
//! Role: Default validator behind `CertLogic::validate_expression`.
//! Invariants: Pure shape checks; no data is consulted.
//! Invariants: Errors are reported in document order; an empty result means valid.

use serde_json::Value;

use super::dates::TimeUnit;
use super::value::integer_of;
use crate::core::outcome::ValidationError;

pub fn validate_format(expr: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate(expr, &mut errors);
    errors
}

fn validate(expr: &Value, errors: &mut Vec<ValidationError>) {
    match expr {
        Value::String(_) | Value::Bool(_) => {}
        Value::Number(n) => {
            if integer_of(n).is_none() {
                errors.push(ValidationError::new(expr, "invalid CertLogic expression"));
            }
        }
        Value::Null => errors.push(ValidationError::new(expr, "invalid CertLogic expression")),
        Value::Array(items) => {
            for item in items {
                validate(item, errors);
            }
        }
        Value::Object(map) => {
            let Some((operator, operand)) = map.iter().next().filter(|_| map.len() == 1) else {
                errors.push(ValidationError::new(
                    expr,
                    format!(
                        "expression object must have exactly one key, but it has {}",
                        map.len()
                    ),
                ));
                return;
            };
            validate_operation(expr, operator, operand, errors);
        }
    }
}

fn validate_operation(
    expr: &Value,
    operator: &str,
    operand: &Value,
    errors: &mut Vec<ValidationError>,
) {
    if operator == "var" {
        if !operand.is_string() {
            errors.push(ValidationError::new(expr, "not of the form { \"var\": \"<path>\" }"));
        }
        return;
    }

    let Some(values) = operand.as_array() else {
        errors.push(ValidationError::new(
            expr,
            "an operation must be of the form { \"<operator>\": [ <values...> ] }",
        ));
        return;
    };
    if values.is_empty() {
        errors.push(ValidationError::new(expr, "an operation must have at least 1 operand"));
        return;
    }

    let mut arity = |ok: bool, message: String| {
        if !ok {
            errors.push(ValidationError::new(expr, message));
        }
    };
    let count = values.len();
    match operator {
        "if" => arity(count == 3, "an if-operation must have exactly 3 operands".into()),
        "and" => arity(
            count >= 2,
            "an \"and\" operation must have at least 2 operands".into(),
        ),
        "<" | ">" | "<=" | ">=" | "after" | "before" | "not-after" | "not-before" => arity(
            count == 2 || count == 3,
            format!("an operation with operator \"{operator}\" must have 2 or 3 operands"),
        ),
        "===" | "in" | "+" => arity(
            count == 2,
            format!("an operation with operator \"{operator}\" must have 2 operands"),
        ),
        "!" => arity(count == 1, "operation of \"!\" must have exactly 1 operand".into()),
        "plusTime" => {
            arity(
                count == 3,
                "an operation with operator \"plusTime\" must have 3 operands".into(),
            );
            validate(&values[0], errors);
            if !is_integer_literal(values.get(1)) {
                errors.push(ValidationError::new(
                    expr,
                    "\"amount\" argument (#2) of \"plusTime\" must be an integer",
                ));
            }
            let unit_ok = values
                .get(2)
                .and_then(Value::as_str)
                .and_then(TimeUnit::from_name)
                .is_some();
            if !unit_ok {
                errors.push(ValidationError::new(
                    expr,
                    format!(
                        "\"unit\" argument (#3) of \"plusTime\" must be a string equal to one of {}",
                        TimeUnit::NAMES.join(", ")
                    ),
                ));
            }
            return;
        }
        "reduce" => arity(
            count == 3,
            "an operation with operator \"reduce\" must have 3 operands".into(),
        ),
        "extractFromUVCI" => {
            arity(
                count == 2,
                "an operation with operator \"extractFromUVCI\" must have 2 operands".into(),
            );
            validate(&values[0], errors);
            if !is_integer_literal(values.get(1)) {
                errors.push(ValidationError::new(
                    expr,
                    "\"index\" argument (#2) of \"extractFromUVCI\" must be an integer",
                ));
            }
            return;
        }
        "dccDateOfBirth" => arity(
            count == 1,
            "an operation with operator \"dccDateOfBirth\" must have 1 operand".into(),
        ),
        _ => {
            errors.push(ValidationError::new(
                expr,
                format!("unrecognised operator: \"{operator}\""),
            ));
            return;
        }
    }

    for value in values {
        validate(value, errors);
    }
}

fn is_integer_literal(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Number(n)) if integer_of(n).is_some())
}

#[cfg(test)]
mod tests {
    use super::validate_format;
    use serde_json::{Value, json};

    fn messages(expr: Value) -> Vec<String> {
        validate_format(&expr)
            .into_iter()
            .map(|error| error.message)
            .collect()
    }

    #[test]
    fn literals_and_well_formed_operations_are_valid() {
        let valid = [
            json!("text"),
            json!(true),
            json!(42),
            json!([1, "a", false]),
            json!({"var": ""}),
            json!({"var": "payload.v.0.dn"}),
            json!({"if": [true, 1, 2]}),
            json!({"and": [true, {"var": "a"}, 1]}),
            json!({"<": [1, {"var": "x"}, 3]}),
            json!({"===": [1, 1]}),
            json!({"in": ["a", ["a", "b"]]}),
            json!({"+": [1, 2]}),
            json!({"!": [false]}),
            json!({"plusTime": [{"var": "d"}, -3, "day"]}),
            json!({"reduce": [{"var": "xs"}, {"+": [{"var": "accumulator"}, 1]}, 0]}),
            json!({"extractFromUVCI": [{"var": "ci"}, 1]}),
            json!({"dccDateOfBirth": [{"var": "dob"}]}),
        ];
        for expr in valid {
            assert!(validate_format(&expr).is_empty(), "{expr} should be valid");
        }
    }

    #[test]
    fn null_and_fractional_numbers_are_invalid() {
        assert_eq!(messages(json!(null)), ["invalid CertLogic expression"]);
        assert_eq!(messages(json!(1.5)), ["invalid CertLogic expression"]);
    }

    #[test]
    fn object_shape_errors() {
        assert_eq!(
            messages(json!({"var": "a", "if": []})),
            ["expression object must have exactly one key, but it has 2"]
        );
        assert_eq!(
            messages(json!({})),
            ["expression object must have exactly one key, but it has 0"]
        );
        assert_eq!(messages(json!({"var": 1})), ["not of the form { \"var\": \"<path>\" }"]);
        assert_eq!(
            messages(json!({"if": true})),
            ["an operation must be of the form { \"<operator>\": [ <values...> ] }"]
        );
        assert_eq!(messages(json!({"if": []})), ["an operation must have at least 1 operand"]);
        assert_eq!(messages(json!({"max": [1, 2]})), ["unrecognised operator: \"max\""]);
    }

    #[test]
    fn arity_errors_are_reported_with_nested_errors() {
        let errors = messages(json!({"if": [null, 1]}));
        assert_eq!(
            errors,
            [
                "an if-operation must have exactly 3 operands",
                "invalid CertLogic expression"
            ]
        );
        assert_eq!(
            messages(json!({"and": [true]})),
            ["an \"and\" operation must have at least 2 operands"]
        );
        assert_eq!(
            messages(json!({"+": [1, 2, 3]})),
            ["an operation with operator \"+\" must have 2 operands"]
        );
    }

    #[test]
    fn plus_time_argument_checks() {
        let errors = messages(json!({"plusTime": [{"var": "d"}, "1", "week"]}));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("\"amount\" argument (#2)"));
        assert!(errors[1].contains("year, month, day, hour"));
    }

    #[test]
    fn extract_from_uvci_index_must_be_integer() {
        assert_eq!(
            messages(json!({"extractFromUVCI": [{"var": "ci"}, {"var": "i"}]})),
            ["\"index\" argument (#2) of \"extractFromUVCI\" must be an integer"]
        );
    }

    #[test]
    fn error_fragments_point_at_offending_subexpression() {
        let errors = validate_format(&json!({"and": [true, {"var": 3}]}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].expr, json!({"var": 3}));
    }
}
