/// Capability contract and hot-swappable registry
///
/// A capability is one node-type implementation: a `type` key, presentation
/// metadata for the editor, and a single async `run` taking the resolved
/// config plus the live run context. The registry maps type keys to
/// capability instances behind an ArcSwap, so registrations swap the whole
/// map atomically and lookups during a run never block.

use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, sync::Arc};

use crate::engine::context::ExecutionContext;

pub mod data;
pub mod fs;
pub mod http;
pub mod logic;
pub mod script;
pub mod triggers;

/// A pluggable node-type implementation
///
/// `run` receives the node's configuration with every `{{context...}}`
/// reference already resolved. It may read earlier results and variables
/// from the context and write new variables; recorded results of other
/// nodes are not reachable for mutation. Failure is an ordinary error
/// return — the engine isolates it to the node.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Lookup key, unique across the registry (e.g., "http_request")
    fn node_type(&self) -> &'static str;

    /// Display name for the editor palette
    fn name(&self) -> &'static str;

    /// One-line description for the editor palette
    fn description(&self) -> &'static str;

    /// Palette color
    fn color(&self) -> &'static str {
        "#5072A7"
    }

    /// Palette icon identifier
    fn icon(&self) -> &'static str {
        "fa-cog"
    }

    /// Declarative config field schema consumed by the editor
    fn config_schema(&self) -> Value {
        json!({})
    }

    /// Execute the node against the resolved config and run context
    async fn run(&self, config: Map<String, Value>, ctx: &mut ExecutionContext) -> Result<Value>;
}

/// Presentation metadata for one registered capability
///
/// Serialized shape matches the editor's node palette endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityInfo {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    #[serde(rename = "configSchema")]
    pub config_schema: Value,
}

/// Lock-free capability registry
///
/// Uses ArcSwap to provide atomic pointer swapping for the capability map.
/// Registration clones the current map, inserts, and stores the new map;
/// concurrent runs keep reading the old snapshot until the swap lands.
pub struct CapabilityRegistry {
    capabilities: ArcSwap<HashMap<String, Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            capabilities: ArcSwap::new(Arc::new(HashMap::new())),
        }
    }

    /// Registry pre-populated with the built-in capability library
    ///
    /// File capabilities are rooted at `workspace_dir`; everything else is
    /// stateless or owns its own client.
    pub fn with_builtins(workspace_dir: impl Into<std::path::PathBuf>) -> Self {
        let registry = Self::new();
        let workspace_dir = workspace_dir.into();

        registry.register(Arc::new(triggers::ManualTrigger));
        registry.register(Arc::new(triggers::WebhookTrigger));
        registry.register(Arc::new(http::HttpRequest::new()));
        registry.register(Arc::new(fs::ReadFile::new(workspace_dir.clone())));
        registry.register(Arc::new(fs::WriteFile::new(workspace_dir)));
        registry.register(Arc::new(logic::IfCondition));
        registry.register(Arc::new(logic::Delay));
        registry.register(Arc::new(logic::Merge));
        registry.register(Arc::new(data::SetVariable));
        registry.register(Arc::new(data::DataTransform));
        registry.register(Arc::new(script::LuaScript));

        tracing::info!(
            "📋 Capability registry initialized with {} node types",
            registry.capabilities.load().len()
        );

        registry
    }

    /// Register or replace a capability under its type key
    pub fn register(&self, capability: Arc<dyn Capability>) {
        let current = self.capabilities.load();
        let mut updated = (**current).clone();
        updated.insert(capability.node_type().to_string(), capability);
        self.capabilities.store(Arc::new(updated));
    }

    /// Look up a capability by type key (lock-free read)
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.load().get(node_type).cloned()
    }

    /// Metadata for every registered capability, sorted by type key
    pub fn node_types(&self) -> Vec<CapabilityInfo> {
        let mut infos: Vec<CapabilityInfo> = self
            .capabilities
            .load()
            .values()
            .map(|cap| CapabilityInfo {
                node_type: cap.node_type().to_string(),
                name: cap.name().to_string(),
                description: cap.description().to_string(),
                color: cap.color().to_string(),
                icon: cap.icon().to_string(),
                config_schema: cap.config_schema(),
            })
            .collect();
        infos.sort_by(|a, b| a.node_type.cmp(&b.node_type));
        infos
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("node_types", &self.capabilities.load().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Capability for Echo {
        fn node_type(&self) -> &'static str {
            "echo"
        }
        fn name(&self) -> &'static str {
            "Echo"
        }
        fn description(&self) -> &'static str {
            "Returns its own config"
        }
        async fn run(
            &self,
            config: Map<String, Value>,
            _ctx: &mut ExecutionContext,
        ) -> Result<Value> {
            Ok(Value::Object(config))
        }
    }

    #[tokio::test]
    async fn register_and_dispatch() {
        let registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));

        let cap = registry.get("echo").unwrap();
        let mut ctx = ExecutionContext::new();
        let mut config = Map::new();
        config.insert("k".to_string(), json!(1));

        let out = cap.run(config, &mut ctx).await.unwrap();
        assert_eq!(out, json!({"k": 1}));
    }

    #[test]
    fn lookup_miss_returns_none() {
        let registry = CapabilityRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn builtins_cover_the_library() {
        let registry = CapabilityRegistry::with_builtins("data/workspace");
        for key in [
            "manual_trigger",
            "webhook_trigger",
            "http_request",
            "read_file",
            "write_file",
            "if_condition",
            "delay",
            "merge",
            "set_variable",
            "data_transform",
            "script",
        ] {
            assert!(registry.get(key).is_some(), "missing builtin: {key}");
        }
    }

    #[test]
    fn node_types_are_sorted_and_carry_defaults() {
        let registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));
        let infos = registry.node_types();

        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].node_type, "echo");
        // Trait defaults apply when a capability declares no presentation
        assert_eq!(infos[0].color, "#5072A7");
        assert_eq!(infos[0].icon, "fa-cog");
    }

    #[test]
    fn registration_replaces_existing_key() {
        let registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Echo));
        assert_eq!(registry.node_types().len(), 1);
    }
}
