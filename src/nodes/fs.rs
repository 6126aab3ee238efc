/// File capabilities rooted at the configured workspace directory
///
/// Paths from node config are flattened to their final component and
/// rejoined under the workspace, so config like `../../etc/passwd` cannot
/// escape it. All I/O goes through tokio::fs.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::Capability;
use crate::engine::context::ExecutionContext;

/// Resolve a config-supplied path to a file inside the workspace
fn workspace_path(base: &Path, raw: &str) -> Result<PathBuf> {
    let file_name = Path::new(raw)
        .file_name()
        .ok_or_else(|| anyhow!("Invalid file path '{}'", raw))?;
    Ok(base.join(file_name))
}

/// Read a file from the workspace as text or parsed JSON
pub struct ReadFile {
    base: PathBuf,
}

impl ReadFile {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl Capability for ReadFile {
    fn node_type(&self) -> &'static str {
        "read_file"
    }

    fn name(&self) -> &'static str {
        "Read File"
    }

    fn description(&self) -> &'static str {
        "Read a file from the workspace"
    }

    fn color(&self) -> &'static str {
        "#795548"
    }

    fn icon(&self) -> &'static str {
        "fa-file"
    }

    fn config_schema(&self) -> Value {
        json!({
            "path": {
                "type": "string",
                "title": "Path",
                "description": "File path relative to the workspace",
                "required": true
            },
            "format": {
                "type": "string",
                "title": "Format",
                "enum": ["auto", "text", "json"],
                "default": "auto"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let raw_path = config
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("read_file missing 'path' parameter"))?;
        let format = config
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("auto");

        let path = workspace_path(&self.base, raw_path)?;
        let format = match format {
            "auto" => {
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    "json"
                } else {
                    "text"
                }
            }
            other => other,
        };

        tracing::debug!("📂 Reading file: {} ({})", path.display(), format);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read file '{}'", path.display()))?;
        let size = text.len();

        let content = match format {
            "json" => serde_json::from_str::<Value>(&text)
                .with_context(|| format!("File '{}' is not valid JSON", path.display()))?,
            "text" => Value::String(text),
            other => return Err(anyhow!("Unsupported read format: {}", other)),
        };

        Ok(json!({
            "path": path.display().to_string(),
            "content": content,
            "format": format,
            "size": size
        }))
    }
}

/// Write or append a file inside the workspace
pub struct WriteFile {
    base: PathBuf,
}

impl WriteFile {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl Capability for WriteFile {
    fn node_type(&self) -> &'static str {
        "write_file"
    }

    fn name(&self) -> &'static str {
        "Write File"
    }

    fn description(&self) -> &'static str {
        "Write content to a file in the workspace"
    }

    fn color(&self) -> &'static str {
        "#795548"
    }

    fn icon(&self) -> &'static str {
        "fa-file-pen"
    }

    fn config_schema(&self) -> Value {
        json!({
            "path": {
                "type": "string",
                "title": "Path",
                "description": "File path relative to the workspace",
                "required": true
            },
            "content": {
                "type": "string",
                "title": "Content",
                "description": "Content to write",
                "required": true
            },
            "mode": {
                "type": "string",
                "title": "Mode",
                "enum": ["overwrite", "append"],
                "default": "overwrite"
            }
        })
    }

    async fn run(
        &self,
        config: Map<String, Value>,
        _ctx: &mut ExecutionContext,
    ) -> Result<Value> {
        let raw_path = config
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("write_file missing 'path' parameter"))?;
        let content = match config.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(anyhow!("write_file missing 'content' parameter")),
        };
        let mode = config
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or("overwrite");

        let path = workspace_path(&self.base, raw_path)?;
        tokio::fs::create_dir_all(&self.base)
            .await
            .with_context(|| format!("Failed to create workspace '{}'", self.base.display()))?;

        tracing::debug!("💾 Writing file: {} ({})", path.display(), mode);
        match mode {
            "append" => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await
                    .with_context(|| format!("Failed to open file '{}'", path.display()))?;
                file.write_all(content.as_bytes())
                    .await
                    .with_context(|| format!("Failed to append to '{}'", path.display()))?;
            }
            "overwrite" => {
                tokio::fs::write(&path, content.as_bytes())
                    .await
                    .with_context(|| format!("Failed to write file '{}'", path.display()))?;
            }
            other => return Err(anyhow!("Unsupported write mode: {}", other)),
        }

        let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);

        Ok(json!({
            "path": path.display().to_string(),
            "size": size,
            "success": true
        }))
    }
}
