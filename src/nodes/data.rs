/// Data capabilities: workflow variables and JSONPath extraction
///
/// `set_variable` is the only built-in that writes to the context's
/// variable namespace; later nodes read it back through
/// `{{context.variables.<name>}}` references. `data_transform` pulls
/// values out of an earlier node's recorded output with a JSONPath
/// expression.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Number, Value};

use super::Capability;
use crate::engine::context::ExecutionContext;

/// Write a typed value into the workflow variable namespace
pub struct SetVariable;

fn coerce_variable(value: &Value, value_type: &str) -> Result<Value> {
    match value_type {
        "number" => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Value::Number(Number::from(i)));
                }
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| anyhow!("Cannot convert '{}' to a number", s))
            }
            other => Err(anyhow!("Cannot convert '{}' to a number", other)),
        },
        "boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "y" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "n" => Ok(Value::Bool(false)),
                _ => Err(anyhow!("Cannot convert '{}' to a boolean", s)),
            },
            other => Err(anyhow!("Cannot convert '{}' to a boolean", other)),
        },
        "json" => match value {
            Value::String(s) => {
                serde_json::from_str(s).map_err(|_| anyhow!("Invalid JSON: {}", s))
            }
            other => Ok(other.clone()),
        },
        // string and anything unrecognized keep the textual rendering
        _ => Ok(match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        }),
    }
}

#[async_trait]
impl Capability for SetVariable {
    fn node_type(&self) -> &'static str {
        "set_variable"
    }

    fn name(&self) -> &'static str {
        "Set Variable"
    }

    fn description(&self) -> &'static str {
        "Define a variable to be used in the workflow"
    }

    fn color(&self) -> &'static str {
        "#9c27b0"
    }

    fn icon(&self) -> &'static str {
        "fa-database"
    }

    fn config_schema(&self) -> Value {
        json!({
            "name": {
                "type": "string",
                "title": "Variable Name",
                "description": "Name of the variable to set",
                "required": true
            },
            "value": {
                "type": "string",
                "title": "Value",
                "description": "Value to assign to the variable",
                "required": true
            },
            "type": {
                "type": "string",
                "title": "Value Type",
                "enum": ["string", "number", "boolean", "json"],
                "default": "string"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let name = config
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| anyhow!("Variable name is required"))?;
        let raw = config.get("value").unwrap_or(&Value::Null);
        let value_type = config
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("string");

        let value = coerce_variable(raw, value_type)?;
        ctx.set_variable(name, value.clone());

        Ok(json!({
            "name": name,
            "value": value,
            "type": value_type
        }))
    }
}

/// Extract from an earlier node's output via a JSONPath expression
pub struct DataTransform;

#[async_trait]
impl Capability for DataTransform {
    fn node_type(&self) -> &'static str {
        "data_transform"
    }

    fn name(&self) -> &'static str {
        "Data Transform"
    }

    fn description(&self) -> &'static str {
        "Extract and reshape data with a JSONPath expression"
    }

    fn color(&self) -> &'static str {
        "#ff9800"
    }

    fn icon(&self) -> &'static str {
        "fa-filter"
    }

    fn config_schema(&self) -> Value {
        json!({
            "source": {
                "type": "string",
                "title": "Source Node",
                "description": "Id of the node whose output to transform",
                "required": true
            },
            "path": {
                "type": "string",
                "title": "JSONPath",
                "description": "Expression selecting values (e.g., $.items[*].name)",
                "required": true
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let source = config
            .get("source")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("data_transform missing 'source' parameter"))?;
        let path = config
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("data_transform missing 'path' parameter"))?;

        let input = ctx
            .get_result(source)
            .ok_or_else(|| anyhow!("No result recorded for node '{}'", source))?;

        let matches = jsonpath_lib::select(input, path)
            .map_err(|e| anyhow!("Invalid JSONPath '{}': {}", path, e))?;
        let result: Vec<Value> = matches.into_iter().cloned().collect();
        let count = result.len();

        Ok(json!({
            "result": result,
            "count": count,
            "path": path
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn set(config: Value) -> (Result<Value>, ExecutionContext) {
        let mut ctx = ExecutionContext::new();
        let map: Map<String, Value> = serde_json::from_value(config).unwrap();
        let out = SetVariable.run(map, &mut ctx).await;
        (out, ctx)
    }

    #[tokio::test]
    async fn string_variable_round_trips() {
        let (out, ctx) = set(json!({"name": "greeting", "value": "hi"})).await;
        assert_eq!(out.unwrap()["value"], "hi");
        assert_eq!(ctx.get_variable("greeting"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn number_type_parses_integers_and_floats() {
        let (out, ctx) = set(json!({"name": "n", "value": "42", "type": "number"})).await;
        assert_eq!(out.unwrap()["value"], 42);
        assert_eq!(ctx.get_variable("n"), Some(&json!(42)));

        let (out, _) = set(json!({"name": "f", "value": "2.5", "type": "number"})).await;
        assert_eq!(out.unwrap()["value"], 2.5);

        let (out, _) = set(json!({"name": "bad", "value": "abc", "type": "number"})).await;
        assert!(out.unwrap_err().to_string().contains("to a number"));
    }

    #[tokio::test]
    async fn boolean_type_accepts_yes_no_words() {
        let (out, _) = set(json!({"name": "b", "value": "yes", "type": "boolean"})).await;
        assert_eq!(out.unwrap()["value"], true);

        let (out, _) = set(json!({"name": "b", "value": "maybe", "type": "boolean"})).await;
        assert!(out.unwrap_err().to_string().contains("to a boolean"));
    }

    #[tokio::test]
    async fn json_type_parses_structures() {
        let (out, ctx) = set(json!({
            "name": "cfg", "value": r#"{"k": [1, 2]}"#, "type": "json"
        }))
        .await;
        assert_eq!(out.unwrap()["value"], json!({"k": [1, 2]}));
        assert_eq!(ctx.get_variable("cfg"), Some(&json!({"k": [1, 2]})));
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let (out, _) = set(json!({"name": "", "value": "x"})).await;
        assert!(out.unwrap_err().to_string().contains("name is required"));
    }

    #[tokio::test]
    async fn transform_selects_with_jsonpath() {
        let mut ctx = ExecutionContext::new();
        ctx.set_result(
            "fetch",
            json!({"items": [{"name": "a", "n": 1}, {"name": "b", "n": 2}]}),
        );

        let config: Map<String, Value> = serde_json::from_value(json!({
            "source": "fetch",
            "path": "$.items[*].name"
        }))
        .unwrap();

        let out = DataTransform.run(config, &mut ctx).await.unwrap();
        assert_eq!(out["result"], json!(["a", "b"]));
        assert_eq!(out["count"], 2);
    }

    #[tokio::test]
    async fn transform_requires_a_recorded_source() {
        let mut ctx = ExecutionContext::new();
        let config: Map<String, Value> = serde_json::from_value(json!({
            "source": "ghost",
            "path": "$.x"
        }))
        .unwrap();

        let err = DataTransform.run(config, &mut ctx).await.unwrap_err();
        assert!(err.to_string().contains("No result recorded"));
    }
}
