/// Entry-point capabilities
///
/// Triggers anchor reachability filtering but execute like any other node:
/// a blocking `run` that returns a mapping. The webhook trigger carries no
/// global listener state — whatever payload arrived with the run request
/// is handed to it through its config.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::Capability;
use crate::engine::context::ExecutionContext;

/// Manual entry point; echoes a trigger confirmation
pub struct ManualTrigger;

#[async_trait]
impl Capability for ManualTrigger {
    fn node_type(&self) -> &'static str {
        "manual_trigger"
    }

    fn name(&self) -> &'static str {
        "Manual Trigger"
    }

    fn description(&self) -> &'static str {
        "Start the workflow manually"
    }

    fn color(&self) -> &'static str {
        "#4caf50"
    }

    fn icon(&self) -> &'static str {
        "fa-play"
    }

    fn config_schema(&self) -> Value {
        json!({
            "name": {
                "type": "string",
                "title": "Trigger Name",
                "description": "Label shown in the run report"
            },
            "description": {
                "type": "string",
                "title": "Description",
                "description": "What this trigger starts"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let trigger_name = config
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Manual Trigger");
        let description = config
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("");

        Ok(json!({
            "trigger_name": trigger_name,
            "description": description,
            "triggered": true,
            "timestamp": Utc::now().to_rfc3339(),
            "trigger_id": "manual"
        }))
    }
}

/// Webhook entry point; surfaces the payload delivered with the run request
pub struct WebhookTrigger;

#[async_trait]
impl Capability for WebhookTrigger {
    fn node_type(&self) -> &'static str {
        "webhook_trigger"
    }

    fn name(&self) -> &'static str {
        "Webhook Trigger"
    }

    fn description(&self) -> &'static str {
        "Start the workflow from an incoming webhook payload"
    }

    fn color(&self) -> &'static str {
        "#ff5722"
    }

    fn icon(&self) -> &'static str {
        "fa-bolt"
    }

    fn config_schema(&self) -> Value {
        json!({
            "payload": {
                "type": "object",
                "title": "Payload",
                "description": "Request body delivered by the caller"
            },
            "headers": {
                "type": "object",
                "title": "Headers",
                "description": "Request headers delivered by the caller"
            },
            "method": {
                "type": "string",
                "title": "Method",
                "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"],
                "default": "POST"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let payload = config.get("payload").cloned().unwrap_or(Value::Null);
        let headers = config.get("headers").cloned().unwrap_or(Value::Null);
        let method = config
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("POST");

        Ok(json!({
            "payload": payload,
            "headers": headers,
            "method": method,
            "received": true,
            "timestamp": Utc::now().to_rfc3339()
        }))
    }
}
