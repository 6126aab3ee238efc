/// Control-flow capabilities: condition evaluation, delays, merging
///
/// `if_condition` coerces the resolved string operands back into numbers
/// and booleans before comparing, so `"5" > "10"` behaves numerically the
/// way workflow authors expect. Relational operators only apply between
/// two numbers or two strings; anything else is a node-level error.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

use super::Capability;
use crate::engine::context::ExecutionContext;

/// Branch decision node with the classic operator set
pub struct IfCondition;

/// Comparable operand after type coercion
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Bool(bool),
    Text(String),
    Json(Value),
}

/// Coerce a config value the way a human reads it: numeric strings become
/// numbers, yes/no words become booleans, everything else stays put
fn coerce(value: &Value) -> Operand {
    match value {
        Value::String(s) => {
            if !s.is_empty() {
                if let Ok(n) = s.parse::<f64>() {
                    return Operand::Number(n);
                }
            }
            match s.to_lowercase().as_str() {
                "true" | "yes" | "y" => Operand::Bool(true),
                "false" | "no" | "n" => Operand::Bool(false),
                _ => Operand::Text(s.clone()),
            }
        }
        Value::Number(n) => Operand::Number(n.as_f64().unwrap_or(0.0)),
        Value::Bool(b) => Operand::Bool(*b),
        other => Operand::Json(other.clone()),
    }
}

fn as_text(operand: &Operand) -> String {
    match operand {
        Operand::Text(s) => s.clone(),
        Operand::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Operand::Bool(b) => b.to_string(),
        Operand::Json(v) => v.to_string(),
    }
}

fn is_empty(operand: &Operand) -> bool {
    match operand {
        Operand::Text(s) => s.is_empty(),
        Operand::Json(Value::Null) => true,
        Operand::Json(Value::Array(items)) => items.is_empty(),
        Operand::Json(Value::Object(map)) => map.is_empty(),
        _ => false,
    }
}

fn compare(value1: &Operand, operator: &str, value2: &Operand) -> Result<bool> {
    let ordering = |a: &Operand, b: &Operand| -> Result<std::cmp::Ordering> {
        match (a, b) {
            (Operand::Number(x), Operand::Number(y)) => Ok(x.total_cmp(y)),
            (Operand::Text(x), Operand::Text(y)) => Ok(x.cmp(y)),
            _ => Err(anyhow!(
                "Cannot apply '{}' between incompatible value types",
                operator
            )),
        }
    };

    match operator {
        "==" => Ok(value1 == value2),
        "!=" => Ok(value1 != value2),
        ">" => Ok(ordering(value1, value2)?.is_gt()),
        "<" => Ok(ordering(value1, value2)?.is_lt()),
        ">=" => Ok(ordering(value1, value2)?.is_ge()),
        "<=" => Ok(ordering(value1, value2)?.is_le()),
        "contains" => Ok(as_text(value1).contains(&as_text(value2))),
        "startsWith" => Ok(as_text(value1).starts_with(&as_text(value2))),
        "endsWith" => Ok(as_text(value1).ends_with(&as_text(value2))),
        "isEmpty" => Ok(is_empty(value1)),
        "isNotEmpty" => Ok(!is_empty(value1)),
        // Anchored at the start like a prefix match; bad patterns are false
        "matches" => {
            let haystack = as_text(value1);
            Ok(Regex::new(&as_text(value2))
                .ok()
                .and_then(|re| re.find(&haystack))
                .is_some_and(|m| m.start() == 0))
        }
        other => Err(anyhow!("Unknown operator: {}", other)),
    }
}

#[async_trait]
impl Capability for IfCondition {
    fn node_type(&self) -> &'static str {
        "if_condition"
    }

    fn name(&self) -> &'static str {
        "If Condition"
    }

    fn description(&self) -> &'static str {
        "Branch workflow based on a condition"
    }

    fn color(&self) -> &'static str {
        "#9c27b0"
    }

    fn icon(&self) -> &'static str {
        "fa-code-branch"
    }

    fn config_schema(&self) -> Value {
        json!({
            "value1": {
                "type": "string",
                "title": "Value 1",
                "description": "First value for comparison"
            },
            "operator": {
                "type": "string",
                "title": "Operator",
                "enum": ["==", "!=", ">", "<", ">=", "<=", "contains",
                         "startsWith", "endsWith", "isEmpty", "isNotEmpty", "matches"],
                "default": "=="
            },
            "value2": {
                "type": "string",
                "title": "Value 2",
                "description": "Second value for comparison"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let value1 = coerce(config.get("value1").unwrap_or(&Value::Null));
        let value2 = coerce(config.get("value2").unwrap_or(&Value::Null));
        let operator = config
            .get("operator")
            .and_then(Value::as_str)
            .unwrap_or("==");

        let result = compare(&value1, operator, &value2)?;

        Ok(json!({
            "result": result,
            "true_path": result,
            "false_path": !result
        }))
    }
}

/// Pause the run for a configured number of milliseconds
pub struct Delay;

const MAX_WAIT_MS: u64 = 60_000;

#[async_trait]
impl Capability for Delay {
    fn node_type(&self) -> &'static str {
        "delay"
    }

    fn name(&self) -> &'static str {
        "Delay"
    }

    fn description(&self) -> &'static str {
        "Pause workflow execution for a specified duration"
    }

    fn color(&self) -> &'static str {
        "#607d8b"
    }

    fn icon(&self) -> &'static str {
        "fa-clock"
    }

    fn config_schema(&self) -> Value {
        json!({
            "duration_ms": {
                "type": "number",
                "title": "Duration (ms)",
                "description": "How long to pause",
                "default": 0
            },
            "max_wait_ms": {
                "type": "number",
                "title": "Max Wait (ms)",
                "description": "Upper bound on the pause",
                "default": MAX_WAIT_MS
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let requested = config
            .get("duration_ms")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let max_wait = config
            .get("max_wait_ms")
            .and_then(Value::as_u64)
            .unwrap_or(MAX_WAIT_MS);
        let wait = requested.min(max_wait);

        let started_at = Utc::now();
        let clock = Instant::now();
        tokio::time::sleep(Duration::from_millis(wait)).await;
        let actual = clock.elapsed().as_millis() as u64;

        Ok(json!({
            "requested_ms": wait,
            "actual_ms": actual,
            "started_at": started_at.to_rfc3339(),
            "finished_at": Utc::now().to_rfc3339()
        }))
    }
}

/// Combine the recorded outputs of the configured source nodes
pub struct Merge;

#[async_trait]
impl Capability for Merge {
    fn node_type(&self) -> &'static str {
        "merge"
    }

    fn name(&self) -> &'static str {
        "Merge"
    }

    fn description(&self) -> &'static str {
        "Combine data from multiple nodes"
    }

    fn color(&self) -> &'static str {
        "#9c27b0"
    }

    fn icon(&self) -> &'static str {
        "fa-object-group"
    }

    fn config_schema(&self) -> Value {
        json!({
            "sources": {
                "type": "array",
                "title": "Sources",
                "description": "Node ids whose outputs to combine",
                "required": true
            },
            "mode": {
                "type": "string",
                "title": "Merge Mode",
                "enum": ["combine", "append", "overwrite"],
                "default": "combine"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let sources: Vec<String> = config
            .get("sources")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mode = config
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or("combine");

        let inputs: Vec<(String, Value)> = sources
            .iter()
            .map(|id| (id.clone(), ctx.get_result(id).cloned().unwrap_or(Value::Null)))
            .collect();

        let merged = match mode {
            "combine" => {
                // Object inputs merge key-by-key, later sources winning;
                // any non-object input switches to keying by source id
                if inputs.iter().all(|(_, v)| v.is_object()) {
                    let mut combined = Map::new();
                    for (_, value) in &inputs {
                        if let Value::Object(map) = value {
                            for (k, v) in map {
                                combined.insert(k.clone(), v.clone());
                            }
                        }
                    }
                    Value::Object(combined)
                } else {
                    let mut keyed = Map::new();
                    for (id, value) in &inputs {
                        keyed.insert(id.clone(), value.clone());
                    }
                    Value::Object(keyed)
                }
            }
            "append" => {
                let mut items = Vec::new();
                for (_, value) in &inputs {
                    match value {
                        Value::Array(inner) => items.extend(inner.iter().cloned()),
                        other => items.push(other.clone()),
                    }
                }
                Value::Array(items)
            }
            "overwrite" => inputs
                .last()
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Null),
            other => return Err(anyhow!("Unknown merge mode: {}", other)),
        };

        Ok(json!({
            "result": merged,
            "mode": mode
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn evaluate(value1: Value, operator: &str, value2: Value) -> Value {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("value1".to_string(), value1);
        config.insert("operator".to_string(), json!(operator));
        config.insert("value2".to_string(), value2);
        IfCondition.run(config, &mut ctx).await.unwrap()
    }

    #[tokio::test]
    async fn numeric_strings_compare_numerically() {
        let out = evaluate(json!("5"), ">", json!("10")).await;
        assert_eq!(out["result"], false);

        let out = evaluate(json!("10.5"), ">=", json!("10")).await;
        assert_eq!(out["result"], true);
        assert_eq!(out["true_path"], true);
        assert_eq!(out["false_path"], false);
    }

    #[tokio::test]
    async fn boolean_words_coerce() {
        let out = evaluate(json!("yes"), "==", json!(true)).await;
        assert_eq!(out["result"], true);
    }

    #[tokio::test]
    async fn string_operators_work_on_text() {
        assert_eq!(
            evaluate(json!("hello world"), "contains", json!("lo wo")).await["result"],
            true
        );
        assert_eq!(
            evaluate(json!("hello"), "startsWith", json!("he")).await["result"],
            true
        );
        assert_eq!(
            evaluate(json!("hello"), "endsWith", json!("he")).await["result"],
            false
        );
    }

    #[tokio::test]
    async fn empty_checks_cover_null_and_containers() {
        assert_eq!(evaluate(json!(""), "isEmpty", Value::Null).await["result"], true);
        assert_eq!(evaluate(json!([]), "isEmpty", Value::Null).await["result"], true);
        assert_eq!(evaluate(json!("x"), "isNotEmpty", Value::Null).await["result"], true);
    }

    #[tokio::test]
    async fn matches_anchors_at_the_start() {
        assert_eq!(
            evaluate(json!("abc123"), "matches", json!("[a-z]+")).await["result"],
            true
        );
        assert_eq!(
            evaluate(json!("123abc"), "matches", json!("[a-z]+")).await["result"],
            false
        );
        // invalid pattern is false, not an error
        assert_eq!(
            evaluate(json!("abc"), "matches", json!("(")).await["result"],
            false
        );
    }

    #[tokio::test]
    async fn incompatible_relational_comparison_is_an_error() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("value1".to_string(), json!("word"));
        config.insert("operator".to_string(), json!(">"));
        config.insert("value2".to_string(), json!(3));
        assert!(IfCondition.run(config, &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn unknown_operator_is_an_error() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("operator".to_string(), json!("~="));
        let err = IfCondition.run(config, &mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("Unknown operator"));
    }

    #[tokio::test]
    async fn delay_sleeps_and_reports_duration() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("duration_ms".to_string(), json!(15));

        let out = Delay.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["requested_ms"], 15);
        assert!(out["actual_ms"].as_u64().unwrap() >= 10);
    }

    #[tokio::test]
    async fn delay_is_capped_by_max_wait() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("duration_ms".to_string(), json!(5_000));
        config.insert("max_wait_ms".to_string(), json!(5));

        let out = Delay.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["requested_ms"], 5);
    }

    #[tokio::test]
    async fn merge_combines_object_outputs() {
        let mut ctx = ExecutionContext::new();
        ctx.set_result("a", json!({"x": 1}));
        ctx.set_result("b", json!({"y": 2, "x": 9}));

        let mut config = Map::new();
        config.insert("sources".to_string(), json!(["a", "b"]));
        let out = Merge.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], json!({"x": 9, "y": 2}));
    }

    #[tokio::test]
    async fn merge_keys_by_source_when_inputs_are_not_objects() {
        let mut ctx = ExecutionContext::new();
        ctx.set_result("a", json!({"x": 1}));
        ctx.set_result("b", json!(42));

        let mut config = Map::new();
        config.insert("sources".to_string(), json!(["a", "b"]));
        let out = Merge.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], json!({"a": {"x": 1}, "b": 42}));
    }

    #[tokio::test]
    async fn merge_append_flattens_arrays() {
        let mut ctx = ExecutionContext::new();
        ctx.set_result("a", json!([1, 2]));
        ctx.set_result("b", json!(3));

        let mut config = Map::new();
        config.insert("sources".to_string(), json!(["a", "b"]));
        config.insert("mode".to_string(), json!("append"));
        let out = Merge.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn merge_overwrite_keeps_the_last_source() {
        let mut ctx = ExecutionContext::new();
        ctx.set_result("a", json!({"x": 1}));
        ctx.set_result("b", json!({"y": 2}));

        let mut config = Map::new();
        config.insert("sources".to_string(), json!(["a", "b"]));
        config.insert("mode".to_string(), json!("overwrite"));
        let out = Merge.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], json!({"y": 2}));
    }

    #[tokio::test]
    async fn merge_treats_missing_sources_as_null() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("sources".to_string(), json!(["ghost"]));
        config.insert("mode".to_string(), json!("overwrite"));
        let out = Merge.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], Value::Null);
    }
}
