/// HTTP request capability backed by reqwest
///
/// One shared client per capability instance; each call enforces its own
/// 30-second timeout. The response body is parsed as JSON when possible
/// and falls back to the raw text, so downstream templates can walk
/// structured APIs and still see plain-text endpoints.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, time::Duration, time::Instant};

use super::Capability;
use crate::engine::context::ExecutionContext;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound HTTP call node
pub struct HttpRequest {
    client: reqwest::Client,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for HttpRequest {
    fn node_type(&self) -> &'static str {
        "http_request"
    }

    fn name(&self) -> &'static str {
        "HTTP Request"
    }

    fn description(&self) -> &'static str {
        "Make HTTP requests to APIs and web services"
    }

    fn color(&self) -> &'static str {
        "#61affe"
    }

    fn icon(&self) -> &'static str {
        "fa-globe"
    }

    fn config_schema(&self) -> Value {
        json!({
            "url": {
                "type": "string",
                "title": "URL",
                "description": "Request URL",
                "required": true
            },
            "method": {
                "type": "string",
                "title": "Method",
                "enum": ["GET", "POST", "PUT", "DELETE", "PATCH"],
                "default": "GET"
            },
            "headers": {
                "type": "object",
                "title": "Headers",
                "description": "Request headers as key/value pairs"
            },
            "body": {
                "type": "string",
                "title": "Body",
                "description": "Raw request body"
            },
            "json": {
                "type": "object",
                "title": "JSON Body",
                "description": "JSON data to send (alternative to body)"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("http_request missing 'url' parameter"))?;
        let method = config
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let headers = config
            .get("headers")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        tracing::debug!("🌐 HTTP request: {} {}", method, url);

        let mut request_builder = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            "PATCH" => self.client.patch(url),
            other => return Err(anyhow!("Unsupported HTTP method: {}", other)),
        };
        request_builder = request_builder.timeout(REQUEST_TIMEOUT);

        for (key, value) in &headers {
            if let Some(header_value) = value.as_str() {
                request_builder = request_builder.header(key, header_value);
            }
        }

        if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
            if let Some(json_body) = config.get("json") {
                request_builder = request_builder.json(json_body);
            } else if let Some(body) = config.get("body").and_then(Value::as_str) {
                request_builder = request_builder
                    .header("Content-Type", "text/plain")
                    .body(body.to_string());
            }
        }

        let started = Instant::now();
        let response = request_builder
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers_map: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let response_text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;
        let response_data = serde_json::from_str::<Value>(&response_text)
            .unwrap_or(Value::String(response_text));

        tracing::debug!("📡 HTTP response: {} {} (status: {})", method, url, status);

        Ok(json!({
            "status_code": status.as_u16(),
            "headers": headers_map,
            "response": response_data,
            "url": final_url,
            "success": status.is_success(),
            "time_ms": started.elapsed().as_millis() as u64
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_url_is_an_error() {
        let mut ctx = ExecutionContext::new();
        let err = HttpRequest::new()
            .run(Map::new(), &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing 'url'"));
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected_before_sending() {
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("url".to_string(), json!("http://localhost:1/never"));
        config.insert("method".to_string(), json!("BREW"));

        let err = HttpRequest::new()
            .run(config, &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported HTTP method: BREW"));
    }
}
