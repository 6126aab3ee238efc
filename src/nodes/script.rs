/// Lua scripting capability (mlua)
///
/// Runs a user snippet against an `input` global built from the resolved
/// config. Each call gets a fresh Lua state with the os/io/debug/package
/// globals removed and small date/time helpers installed instead. Tables
/// come back as JSON objects or arrays; a script returning a bare scalar
/// is wrapped under `result` so every node output stays a mapping.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::Capability;
use crate::engine::context::ExecutionContext;

/// User-supplied Lua snippet node
pub struct LuaScript;

#[async_trait]
impl Capability for LuaScript {
    fn node_type(&self) -> &'static str {
        "script"
    }

    fn name(&self) -> &'static str {
        "Lua Script"
    }

    fn description(&self) -> &'static str {
        "Run a Lua snippet against the resolved input"
    }

    fn color(&self) -> &'static str {
        "#2196f3"
    }

    fn icon(&self) -> &'static str {
        "fa-code"
    }

    fn config_schema(&self) -> Value {
        json!({
            "script": {
                "type": "string",
                "title": "Script",
                "description": "Lua snippet; `input` holds the configured input value",
                "required": true
            },
            "input": {
                "type": "object",
                "title": "Input",
                "description": "Value exposed to the script as `input`"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let script = config
            .get("script")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("script missing 'script' parameter"))?;
        let input = config.get("input").cloned().unwrap_or(Value::Null);

        // Fresh state per call keeps script runs isolated from each other
        let lua = mlua::Lua::new();
        let globals = lua.globals();

        globals
            .set(
                "date",
                lua.create_function(|_, format: String| {
                    Ok(chrono::Utc::now().format(&format).to_string())
                })
                .map_err(|e| anyhow!("Failed to create date helper: {}", e))?,
            )
            .map_err(|e| anyhow!("Failed to set date helper: {}", e))?;
        globals
            .set(
                "time",
                lua.create_function(|_, ()| Ok(chrono::Utc::now().timestamp()))
                    .map_err(|e| anyhow!("Failed to create time helper: {}", e))?,
            )
            .map_err(|e| anyhow!("Failed to set time helper: {}", e))?;
        globals
            .set(
                "now",
                lua.create_function(|_, ()| Ok(chrono::Utc::now().to_rfc3339()))
                    .map_err(|e| anyhow!("Failed to create now helper: {}", e))?,
            )
            .map_err(|e| anyhow!("Failed to set now helper: {}", e))?;

        // Strip process-touching globals (ignore errors)
        let _ = globals.set("os", mlua::Nil);
        let _ = globals.set("io", mlua::Nil);
        let _ = globals.set("debug", mlua::Nil);
        let _ = globals.set("package", mlua::Nil);

        let setup = format!("input = {}", json_to_lua_string(&input)?);
        lua.load(&setup)
            .exec()
            .map_err(|e| anyhow!("Failed to set up Lua input: {}", e))?;

        tracing::debug!("🧠 Running Lua script ({} bytes)", script.len());
        let lua_result: mlua::Value = lua
            .load(script)
            .eval()
            .map_err(|e| anyhow!("Lua script execution failed: {}", e))?;

        let result = lua_to_json(lua_result)?;
        Ok(match result {
            Value::Object(map) => Value::Object(map),
            other => json!({ "result": other }),
        })
    }
}

/// Render a JSON value as a Lua literal
fn json_to_lua_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("nil".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(format!(
            "\"{}\"",
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n")
                .replace('\r', "\\r")
        )),
        Value::Array(items) => {
            let mut lua_items = Vec::new();
            for item in items {
                lua_items.push(json_to_lua_string(item)?);
            }
            Ok(format!("{{{}}}", lua_items.join(", ")))
        }
        Value::Object(map) => {
            let mut lua_pairs = Vec::new();
            for (key, val) in map {
                // Bracket notation handles keys with special characters
                lua_pairs.push(format!(
                    "[\"{}\"] = {}",
                    key.replace('\\', "\\\\").replace('"', "\\\""),
                    json_to_lua_string(val)?
                ));
            }
            Ok(format!("{{{}}}", lua_pairs.join(", ")))
        }
    }
}

/// Convert a Lua value back to JSON
fn lua_to_json(lua_value: mlua::Value) -> Result<Value> {
    match lua_value {
        mlua::Value::Nil => Ok(Value::Null),
        mlua::Value::Boolean(b) => Ok(Value::Bool(b)),
        mlua::Value::Integer(i) => Ok(Value::Number(serde_json::Number::from(i))),
        mlua::Value::Number(f) => Ok(serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        mlua::Value::String(s) => {
            let text = s
                .to_str()
                .map_err(|e| anyhow!("Invalid UTF-8 in Lua string: {}", e))?;
            Ok(Value::String(text.to_string()))
        }
        mlua::Value::Table(table) => {
            // Contiguous 1..n integer keys mean an array, anything else an object
            let mut is_array = true;
            let mut max_index = 0usize;
            let mut count = 0usize;
            for pair in table.pairs::<mlua::Value, mlua::Value>() {
                let (key, _) =
                    pair.map_err(|e| anyhow!("Failed to iterate Lua table: {}", e))?;
                count += 1;
                match key {
                    mlua::Value::Integer(i) if i > 0 => {
                        max_index = max_index.max(i as usize);
                    }
                    _ => {
                        is_array = false;
                        break;
                    }
                }
            }

            if is_array && count > 0 && count == max_index {
                let mut items = Vec::with_capacity(count);
                for i in 1..=max_index {
                    let value: mlua::Value = table
                        .get(i)
                        .map_err(|e| anyhow!("Failed to get Lua table value: {}", e))?;
                    items.push(lua_to_json(value)?);
                }
                Ok(Value::Array(items))
            } else {
                let mut map = Map::new();
                for pair in table.pairs::<mlua::Value, mlua::Value>() {
                    let (key, value) =
                        pair.map_err(|e| anyhow!("Failed to iterate Lua table: {}", e))?;
                    let key = match key {
                        mlua::Value::String(s) => s
                            .to_str()
                            .map_err(|e| anyhow!("Invalid UTF-8 in Lua key: {}", e))?
                            .to_string(),
                        mlua::Value::Integer(i) => i.to_string(),
                        mlua::Value::Number(f) => f.to_string(),
                        _ => continue,
                    };
                    map.insert(key, lua_to_json(value)?);
                }
                Ok(Value::Object(map))
            }
        }
        _ => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_script(script: &str, input: Value) -> Result<Value> {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("script".to_string(), json!(script));
        if !input.is_null() {
            config.insert("input".to_string(), input);
        }
        LuaScript.run(config, &mut ctx).await
    }

    #[tokio::test]
    async fn table_results_become_objects() {
        let out = run_script("return {sum = 1 + 2}", Value::Null).await.unwrap();
        assert_eq!(out, json!({"sum": 3}));
    }

    #[tokio::test]
    async fn input_global_carries_the_configured_value() {
        let out = run_script(
            "return {double = input.n * 2, label = input.label}",
            json!({"n": 4, "label": "x\"y"}),
        )
        .await
        .unwrap();
        assert_eq!(out["double"], 8);
        assert_eq!(out["label"], "x\"y");
    }

    #[tokio::test]
    async fn sequential_tables_become_arrays() {
        let out = run_script("return {result = {10, 20, 30}}", Value::Null)
            .await
            .unwrap();
        assert_eq!(out["result"], json!([10, 20, 30]));
    }

    #[tokio::test]
    async fn scalar_results_are_wrapped() {
        let out = run_script("return 7", Value::Null).await.unwrap();
        assert_eq!(out, json!({"result": 7}));
    }

    #[tokio::test]
    async fn os_and_io_are_unavailable() {
        let out = run_script("return {blocked = os == nil and io == nil}", Value::Null)
            .await
            .unwrap();
        assert_eq!(out["blocked"], true);
    }

    #[tokio::test]
    async fn syntax_errors_are_node_errors() {
        let err = run_script("return {", Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("Lua script execution failed"));
    }
}
