//! Purpose: List every data path a CertLogic expression can read, with the operation reading it.
//! Exports: `data_accesses`.
//! Role: Backs `CertLogic::data_accesses`; shown next to a valid expression's result.
//! Invariants: Accesses are reported in document order, duplicates included.
//! Invariants: Paths are relative to the data buffer, also inside `reduce` lambdas.
//! Notes: Only meaningful for expressions that passed `validate_format`.

use serde_json::Value;

use crate::core::outcome::DataAccess;

pub fn data_accesses(expr: &Value) -> Vec<DataAccess> {
    let mut accesses = Vec::new();
    collect(expr, None, 0, &mut accesses);
    accesses
}

/// `lambda_depth` counts enclosing `reduce` lambdas; each one rebinds the
/// outer data under `data`.
fn collect(expr: &Value, context: Option<&Value>, lambda_depth: usize, out: &mut Vec<DataAccess>) {
    match expr {
        Value::Array(items) => {
            for item in items {
                collect(item, context, lambda_depth, out);
            }
        }
        Value::Object(map) if map.len() == 1 => {
            let Some((operator, operand)) = map.iter().next() else {
                return;
            };
            if operator == "var" {
                let Some(path) = operand.as_str() else {
                    return;
                };
                if let Some(path) = resolve(path, lambda_depth) {
                    out.push(DataAccess {
                        path,
                        context: context.unwrap_or(expr).clone(),
                    });
                }
                return;
            }
            let Some(values) = operand.as_array() else {
                return;
            };
            if let ("reduce", [items, lambda, initial]) = (operator.as_str(), values.as_slice()) {
                collect(items, Some(expr), lambda_depth, out);
                collect(lambda, Some(expr), lambda_depth + 1, out);
                collect(initial, Some(expr), lambda_depth, out);
                return;
            }
            for value in values {
                collect(value, Some(expr), lambda_depth, out);
            }
        }
        _ => {}
    }
}

/// Maps a path read inside `lambda_depth` lambdas back onto the data buffer.
/// `None` for `accumulator`/`current` and anything else local to a lambda.
fn resolve(path: &str, lambda_depth: usize) -> Option<String> {
    if lambda_depth == 0 {
        return Some(path.to_string());
    }
    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    match head {
        "data" => resolve(rest, lambda_depth - 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::data_accesses;
    use serde_json::{Value, json};

    fn paths(expr: Value) -> Vec<String> {
        data_accesses(&expr).into_iter().map(|a| a.path).collect()
    }

    #[test]
    fn top_level_var_is_its_own_context() {
        let expr = json!({"var": "payload.v.0"});
        let accesses = data_accesses(&expr);
        assert_eq!(accesses.len(), 1);
        assert_eq!(accesses[0].path, "payload.v.0");
        assert_eq!(accesses[0].context, expr);
    }

    #[test]
    fn context_is_nearest_enclosing_operation() {
        let inner = json!({"===": [{"var": "payload.v.0.dn"}, {"var": "payload.v.0.sd"}]});
        let expr = json!({"if": [{"var": "payload.v.0"}, inner.clone(), false]});
        let accesses = data_accesses(&expr);
        let found: Vec<(&str, &Value)> =
            accesses.iter().map(|a| (a.path.as_str(), &a.context)).collect();
        assert_eq!(
            found,
            vec![
                ("payload.v.0", &expr),
                ("payload.v.0.dn", &inner),
                ("payload.v.0.sd", &inner),
            ]
        );
    }

    #[test]
    fn reduce_lambda_reads_map_back_to_data() {
        let expr = json!({"reduce": [
            {"var": "payload.v"},
            {"and": [
                {"var": "accumulator"},
                {"===": [{"var": "current.tg"}, {"var": "data.want"}]}
            ]},
            true
        ]});
        assert_eq!(paths(expr), vec!["payload.v", "want"]);
    }

    #[test]
    fn nested_reduce_strips_one_data_prefix_per_lambda() {
        let expr = json!({"reduce": [
            {"var": "outer"},
            {"reduce": [
                {"var": "data.inner"},
                {"+": [{"var": "accumulator"}, {"var": "data.data.n"}]},
                0
            ]},
            0
        ]});
        assert_eq!(paths(expr), vec!["outer", "inner", "n"]);
    }

    #[test]
    fn literals_have_no_accesses() {
        assert!(paths(json!([1, "a", true, {"+": [1, 2]}])).is_empty());
    }
}
