//! Purpose: Evaluate a CertLogic expression against a data value.
//! Exports: `evaluate`, `extract_from_uvci`.
//! Role: Default evaluator behind `CertLogic::evaluate_expression`.
//! Invariants: Pure and total over its inputs; every problem is an `EvaluationFault`.
//! Invariants: `and` short-circuits; no other operator skips operand evaluation (except `if`).
//! Notes: Runs on any JSON value, but callers are expected to validate first.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use super::dates::{self, TimeUnit};
use super::value::{CertValue, Truthiness, integer_of};
use crate::core::outcome::EvaluationFault;

type EvalResult = Result<CertValue, EvaluationFault>;

pub fn evaluate(expr: &Value, data: &Value) -> Result<Value, EvaluationFault> {
    let data = CertValue::from_json(data);
    evaluate_value(expr, &data)?.into_json().map_err(fault)
}

fn describe(value: CertValue) -> String {
    value
        .into_json()
        .map_or_else(|err| err, |json| json.to_string())
}

fn fault(message: impl Into<String>) -> EvaluationFault {
    EvaluationFault::new(message)
}

fn evaluate_value(expr: &Value, data: &CertValue) -> EvalResult {
    match expr {
        Value::String(s) => Ok(CertValue::Str(s.clone())),
        Value::Bool(b) => Ok(CertValue::Bool(*b)),
        Value::Number(n) if integer_of(n).is_some() => Ok(CertValue::Number(n.clone())),
        Value::Number(_) | Value::Null => {
            Err(fault(format!("invalid CertLogic expression: {expr}")))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| evaluate_value(item, data))
            .collect::<Result<Vec<_>, _>>()
            .map(CertValue::Arr),
        Value::Object(map) => {
            let Some((operator, operand)) = map.iter().next().filter(|_| map.len() == 1) else {
                return Err(fault("unrecognised expression object encountered"));
            };
            if operator == "var" {
                return evaluate_var(operand, data);
            }
            let values = match operand.as_array() {
                Some(values) if !values.is_empty() => values.as_slice(),
                _ => {
                    return Err(fault(
                        "operation not of the form { \"<operator>\": [ <values...> ] }",
                    ));
                }
            };
            match operator.as_str() {
                "if" => evaluate_if(values, data),
                "===" | "and" | "<" | ">" | "<=" | ">=" | "in" | "+" | "after" | "before"
                | "not-after" | "not-before" => evaluate_infix(operator, values, data),
                "!" => evaluate_not(&values[0], data),
                "plusTime" => evaluate_plus_time(values, data),
                "reduce" => evaluate_reduce(values, data),
                "extractFromUVCI" => evaluate_extract_from_uvci(values, data),
                "dccDateOfBirth" => evaluate_dcc_date_of_birth(&values[0], data),
                other => Err(fault(format!("unrecognised operator: \"{other}\""))),
            }
        }
    }
}

fn evaluate_var(operand: &Value, data: &CertValue) -> EvalResult {
    let Some(path) = operand.as_str() else {
        return Err(fault("not of the form { \"var\": \"<path>\" }"));
    };
    let mut current = data;
    for fragment in path.split('.') {
        let next = match current {
            CertValue::Obj(map) => map.get(fragment),
            CertValue::Arr(items) => fragment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(CertValue::Null),
        }
    }
    Ok(current.clone())
}

fn evaluate_if(values: &[Value], data: &CertValue) -> EvalResult {
    let [guard, then, otherwise] = values else {
        return Err(fault("an if-operation must have exactly 3 operands"));
    };
    let guard_value = evaluate_value(guard, data)?;
    match guard_value.truthiness() {
        Truthiness::Truthy => evaluate_value(then, data),
        Truthiness::Falsy => evaluate_value(otherwise, data),
        Truthiness::Neither => Err(fault(format!(
            "if-guard evaluates to something neither truthy, nor falsy: {}",
            describe(guard_value)
        ))),
    }
}

fn evaluate_not(operand: &Value, data: &CertValue) -> EvalResult {
    let value = evaluate_value(operand, data)?;
    match value.truthiness() {
        Truthiness::Falsy => Ok(CertValue::Bool(true)),
        Truthiness::Truthy => Ok(CertValue::Bool(false)),
        Truthiness::Neither => Err(fault(format!(
            "operand of ! evaluates to something neither truthy, nor falsy: {}",
            describe(value)
        ))),
    }
}

fn check_infix_arity(operator: &str, count: usize) -> Result<(), EvaluationFault> {
    match operator {
        "and" if count < 2 => Err(fault("an \"and\" operation must have at least 2 operands")),
        "<" | ">" | "<=" | ">=" | "after" | "before" | "not-after" | "not-before"
            if !(2..=3).contains(&count) =>
        {
            Err(fault(format!(
                "an operation with operator \"{operator}\" must have 2 or 3 operands"
            )))
        }
        "===" | "in" | "+" if count != 2 => Err(fault(format!(
            "an operation with operator \"{operator}\" must have 2 operands"
        ))),
        _ => Ok(()),
    }
}

fn evaluate_infix(operator: &str, values: &[Value], data: &CertValue) -> EvalResult {
    check_infix_arity(operator, values.len())?;

    if operator == "and" {
        let mut acc = CertValue::Bool(true);
        for value in values {
            match acc.truthiness() {
                Truthiness::Falsy => return Ok(acc),
                Truthiness::Truthy => acc = evaluate_value(value, data)?,
                Truthiness::Neither => {
                    return Err(fault(
                        "all operands of an \"and\" operation must be either truthy or falsy",
                    ));
                }
            }
        }
        return Ok(acc);
    }

    let args = values
        .iter()
        .map(|value| evaluate_value(value, data))
        .collect::<Result<Vec<_>, _>>()?;

    match operator {
        "===" => Ok(CertValue::Bool(args[0] == args[1])),
        "in" => match &args[1] {
            CertValue::Arr(items) => Ok(CertValue::Bool(items.contains(&args[0]))),
            _ => Err(fault(
                "right-hand side of an \"in\" operation must be an array",
            )),
        },
        "+" => match (args[0].as_integer(), args[1].as_integer()) {
            (Some(l), Some(r)) => l
                .checked_add(r)
                .map(CertValue::integer)
                .ok_or_else(|| fault("integer overflow in \"+\" operation")),
            _ => Err(fault("operands of this operation must both be integers")),
        },
        "<" | ">" | "<=" | ">=" => {
            let ints = args
                .iter()
                .map(CertValue::as_integer)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| fault("all operands of a comparison operation must be integers"))?;
            Ok(CertValue::Bool(compare_chain(operator, &ints)))
        }
        _ => {
            let times = args
                .iter()
                .map(CertValue::as_date_time)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| fault("all operands of a date-time comparison must be date-times"))?;
            Ok(CertValue::Bool(compare_chain(operator, &times)))
        }
    }
}

fn compare_chain<T: Ord>(operator: &str, operands: &[T]) -> bool {
    operands.windows(2).all(|pair| {
        let ordering = pair[0].cmp(&pair[1]);
        match operator {
            "<" | "before" => ordering == Ordering::Less,
            ">" | "after" => ordering == Ordering::Greater,
            "<=" | "not-after" => ordering != Ordering::Greater,
            ">=" | "not-before" => ordering != Ordering::Less,
            _ => false,
        }
    })
}

fn evaluate_plus_time(values: &[Value], data: &CertValue) -> EvalResult {
    let [operand, amount, unit] = values else {
        return Err(fault("an operation with operator \"plusTime\" must have 3 operands"));
    };
    let amount = match amount {
        Value::Number(n) => integer_of(n),
        _ => None,
    }
    .ok_or_else(|| fault("\"amount\" argument (#2) of \"plusTime\" must be an integer"))?;
    let unit = unit.as_str().and_then(TimeUnit::from_name).ok_or_else(|| {
        fault(format!(
            "\"unit\" argument (#3) of \"plusTime\" must be a string equal to one of {}",
            TimeUnit::NAMES.join(", ")
        ))
    })?;
    let CertValue::Str(text) = evaluate_value(operand, data)? else {
        return Err(fault(
            "date argument of \"plusTime\" must be a string in an allowed date or date-time format",
        ));
    };
    let date_time = dates::parse_date_time(&text).map_err(fault)?;
    dates::plus_time(date_time, amount, unit)
        .map(CertValue::DateTime)
        .map_err(fault)
}

fn evaluate_reduce(values: &[Value], data: &CertValue) -> EvalResult {
    let [operand, lambda, initial] = values else {
        return Err(fault("an operation with operator \"reduce\" must have 3 operands"));
    };
    let items = evaluate_value(operand, data)?;
    let initial = evaluate_value(initial, data)?;
    match items {
        CertValue::Null => Ok(initial),
        CertValue::Arr(items) => items.into_iter().try_fold(initial, |accumulator, current| {
            let mut scope = BTreeMap::new();
            scope.insert("accumulator".to_string(), accumulator);
            scope.insert("current".to_string(), current);
            scope.insert("data".to_string(), data.clone());
            evaluate_value(lambda, &CertValue::Obj(scope))
        }),
        other => Err(fault(format!(
            "operand of reduce evaluated to a non-null non-array: {}",
            other.type_name()
        ))),
    }
}

fn evaluate_extract_from_uvci(values: &[Value], data: &CertValue) -> EvalResult {
    let [operand, index] = values else {
        return Err(fault(
            "an operation with operator \"extractFromUVCI\" must have 2 operands",
        ));
    };
    let index = match index {
        Value::Number(n) => integer_of(n),
        _ => None,
    }
    .ok_or_else(|| fault("\"index\" argument (#2) of \"extractFromUVCI\" must be an integer"))?;
    let uvci = match evaluate_value(operand, data)? {
        CertValue::Null => None,
        CertValue::Str(text) => Some(text),
        _ => {
            return Err(fault(
                "\"UVCI\" argument (#1) of \"extractFromUVCI\" must be either a string or null",
            ));
        }
    };
    Ok(extract_from_uvci(uvci.as_deref(), index)
        .map(CertValue::Str)
        .unwrap_or(CertValue::Null))
}

/// Fragment `index` of a UVCI, split on `/`, `#`, and `:` after the optional `URN:UVCI:` prefix.
pub fn extract_from_uvci(uvci: Option<&str>, index: i64) -> Option<String> {
    let uvci = uvci?;
    let index = usize::try_from(index).ok()?;
    let stripped = uvci.strip_prefix("URN:UVCI:").unwrap_or(uvci);
    stripped.split(['/', '#', ':']).nth(index).map(str::to_string)
}

fn evaluate_dcc_date_of_birth(operand: &Value, data: &CertValue) -> EvalResult {
    let CertValue::Str(text) = evaluate_value(operand, data)? else {
        return Err(fault("operand of \"dccDateOfBirth\" must be a string"));
    };
    dates::parse_date_of_birth(&text)
        .map(CertValue::DateTime)
        .map_err(fault)
}
