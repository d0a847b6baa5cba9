//! Purpose: Runtime value model for CertLogic evaluation.
//! Exports: `CertValue`, `Truthiness`, `integer_of`.
//! Role: Mirror of `serde_json::Value` plus a date-time variant produced by date operations.
//! Invariants: `from_json(v).into_json() == Ok(v)` for every JSON value.
//! Invariants: Date-times serialize as `YYYY-MM-DDThh:mm:ss.mmmZ`.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use time::OffsetDateTime;

use super::dates;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Truthiness {
    Truthy,
    Falsy,
    Neither,
}

#[derive(Clone, Debug)]
pub enum CertValue {
    Null,
    Bool(bool),
    Number(Number),
    Str(String),
    Arr(Vec<CertValue>),
    Obj(BTreeMap<String, CertValue>),
    DateTime(OffsetDateTime),
}

impl CertValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(a) => Self::Arr(a.iter().map(Self::from_json).collect()),
            Value::Object(o) => Self::Obj(
                o.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Fails only if a date-time cannot be formatted.
    pub fn into_json(self) -> Result<Value, String> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Number(n) => Value::Number(n),
            Self::Str(s) => Value::String(s),
            Self::Arr(a) => Value::Array(
                a.into_iter()
                    .map(Self::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Self::Obj(o) => Value::Object(
                o.into_iter()
                    .map(|(k, v)| v.into_json().map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
            Self::DateTime(dt) => Value::String(dates::format_date_time(dt)?),
        })
    }

    pub fn integer(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) => integer_of(n),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<OffsetDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn truthiness(&self) -> Truthiness {
        let truthy = match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::Str(s) => !s.is_empty(),
            Self::Arr(a) => !a.is_empty(),
            Self::Obj(o) => !o.is_empty(),
            Self::DateTime(_) => return Truthiness::Neither,
        };
        if truthy {
            Truthiness::Truthy
        } else {
            Truthiness::Falsy
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Arr(_) => "array",
            Self::Obj(_) => "object",
            Self::DateTime(_) => "date-time",
        }
    }
}

impl PartialEq for CertValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a == b,
                _ => a.as_f64() == b.as_f64(),
            },
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Arr(a), Self::Arr(b)) => a == b,
            (Self::Obj(a), Self::Obj(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

/// Integral numbers only, including `2.0`; values past 2^53 are not exact and are rejected.
pub fn integer_of(number: &Number) -> Option<i64> {
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= EXACT {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{CertValue, Truthiness, integer_of};
    use serde_json::{Number, json};

    #[test]
    fn json_round_trip_is_lossless() {
        let value = json!({"a": [1, 2.5, "x", null, true], "b": {"c": {}}});
        assert_eq!(CertValue::from_json(&value).into_json().expect("json"), value);
    }

    #[test]
    fn truthiness_follows_certlogic_rules() {
        let falsy = [json!(false), json!(null), json!(""), json!(0), json!([]), json!({})];
        for value in falsy {
            assert_eq!(CertValue::from_json(&value).truthiness(), Truthiness::Falsy, "{value}");
        }
        let truthy = [json!(true), json!("x"), json!(-1), json!([0]), json!({"a": null})];
        for value in truthy {
            assert_eq!(CertValue::from_json(&value).truthiness(), Truthiness::Truthy, "{value}");
        }
    }

    #[test]
    fn integers_accept_integral_floats() {
        assert_eq!(integer_of(&Number::from(3)), Some(3));
        assert_eq!(integer_of(&Number::from_f64(2.0).expect("finite")), Some(2));
        assert_eq!(integer_of(&Number::from_f64(2.5).expect("finite")), None);
        assert_eq!(integer_of(&Number::from(u64::MAX)), None);
    }

    #[test]
    fn numbers_compare_by_value() {
        let int = CertValue::from_json(&json!(1));
        let float = CertValue::from_json(&json!(1.0));
        assert_eq!(int, float);
    }
}
