/// Inter-node reference resolution inside node configuration
///
/// Before a node runs, its config is deep-copied and every string value is
/// scanned for `{{ ... }}` placeholders. A placeholder is substituted only
/// when its trimmed inner text is `context.<nodeId>.<key>(.<key>)*`; the
/// path walks the referenced node's recorded output. Missing nodes or keys
/// become bracketed diagnostic strings in place, never errors, so one
/// broken reference cannot take down the node it appears in. Anything not
/// matching the grammar is left verbatim.
///
/// The reserved id `variables` reads the workflow-scoped variable
/// namespace instead, unless an executed node is literally named
/// `variables` (the node wins).

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::context::ExecutionContext;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(.*?)\}\}").unwrap())
}

/// Resolve every placeholder in a node's config, returning a new mapping
pub fn resolve_config(config: &Map<String, Value>, ctx: &ExecutionContext) -> Map<String, Value> {
    config
        .iter()
        .map(|(k, v)| (k.clone(), resolve_value(v, ctx)))
        .collect()
}

/// Recursive walk over a config value, resolving strings in place
pub fn resolve_value(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::Object(map) => Value::Object(resolve_config(map, ctx)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| resolve_value(v, ctx)).collect())
        }
        Value::String(text) => Value::String(resolve_str(text, ctx)),
        other => other.clone(),
    }
}

/// Resolve placeholders within a single string
pub fn resolve_str(text: &str, ctx: &ExecutionContext) -> String {
    placeholder_re()
        .replace_all(text, |caps: &Captures| substitute(&caps[0], &caps[1], ctx))
        .into_owned()
}

fn substitute(raw: &str, inner: &str, ctx: &ExecutionContext) -> String {
    let parts: Vec<&str> = inner.trim().split('.').collect();
    if parts.len() < 3 || parts[0] != "context" {
        return raw.to_string();
    }

    let node_id = parts[1];
    let key_path = &parts[2..];
    // Diagnostics always name the full dotted key, not the failing component
    let key = key_path.join(".");

    if let Some(root) = ctx.get_result(node_id) {
        return walk(root, key_path, &key, node_id);
    }

    if node_id == "variables" {
        return match ctx.get_variable(key_path[0]) {
            Some(root) => walk(root, &key_path[1..], &key, node_id),
            None => format!("[Key {} not found in node {}]", key, node_id),
        };
    }

    format!("[Node {} not found]", node_id)
}

fn walk(root: &Value, parts: &[&str], key: &str, node_id: &str) -> String {
    let mut value = root;
    for part in parts {
        match value.get(part) {
            Some(next) => value = next,
            None => return format!("[Key {} not found in node {}]", key, node_id),
        }
    }
    stringify(value)
}

/// Strings substitute as-is; everything else uses its JSON rendering
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(node_id: &str, result: Value) -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.set_result(node_id, result);
        ctx
    }

    #[test]
    fn plain_strings_pass_through_unchanged() {
        let ctx = ExecutionContext::new();
        assert_eq!(resolve_str("no markers here", &ctx), "no markers here");
        // Resolution is idempotent on already-resolved text
        assert_eq!(resolve_str("[Node x not found]", &ctx), "[Node x not found]");
    }

    #[test]
    fn substitutes_simple_reference() {
        let ctx = ctx_with("n1", json!({"value": "hello"}));
        assert_eq!(resolve_str("{{context.n1.value}}", &ctx), "hello");
    }

    #[test]
    fn substitutes_inside_larger_string_and_trims() {
        let ctx = ctx_with("n1", json!({"count": 5}));
        assert_eq!(
            resolve_str("got {{ context.n1.count }} items", &ctx),
            "got 5 items"
        );
    }

    #[test]
    fn walks_nested_paths() {
        let ctx = ctx_with("fetch", json!({"body": {"user": {"name": "ada"}}}));
        assert_eq!(
            resolve_str("{{context.fetch.body.user.name}}", &ctx),
            "ada"
        );
    }

    #[test]
    fn missing_node_becomes_diagnostic() {
        let ctx = ExecutionContext::new();
        assert_eq!(
            resolve_str("{{context.ghost.value}}", &ctx),
            "[Node ghost not found]"
        );
    }

    #[test]
    fn missing_key_becomes_diagnostic() {
        let ctx = ctx_with("n1", json!({"a": 1}));
        assert_eq!(
            resolve_str("{{context.n1.b}}", &ctx),
            "[Key b not found in node n1]"
        );
        // Diagnostic carries the whole dotted key that failed to resolve
        assert_eq!(
            resolve_str("{{context.n1.a.deeper}}", &ctx),
            "[Key a.deeper not found in node n1]"
        );
    }

    #[test]
    fn malformed_references_stay_verbatim() {
        let ctx = ctx_with("n1", json!({"a": 1}));
        assert_eq!(resolve_str("{{n1.a}}", &ctx), "{{n1.a}}");
        assert_eq!(resolve_str("{{context.n1}}", &ctx), "{{context.n1}}");
        assert_eq!(resolve_str("{{}}", &ctx), "{{}}");
    }

    #[test]
    fn non_string_values_use_json_rendering() {
        let ctx = ctx_with("n1", json!({"flag": true, "obj": {"k": 1}}));
        assert_eq!(resolve_str("{{context.n1.flag}}", &ctx), "true");
        assert_eq!(resolve_str("{{context.n1.obj}}", &ctx), r#"{"k":1}"#);
    }

    #[test]
    fn variables_namespace_resolves_under_reserved_id() {
        let mut ctx = ExecutionContext::new();
        ctx.set_variable("user", json!({"name": "ada"}));
        assert_eq!(resolve_str("{{context.variables.user.name}}", &ctx), "ada");
        assert_eq!(
            resolve_str("{{context.variables.missing}}", &ctx),
            "[Key missing not found in node variables]"
        );
        assert_eq!(
            resolve_str("{{context.variables.user.wrong}}", &ctx),
            "[Key user.wrong not found in node variables]"
        );
    }

    #[test]
    fn executed_node_named_variables_wins_over_namespace() {
        let mut ctx = ctx_with("variables", json!({"user": "from-node"}));
        ctx.set_variable("user", json!("from-namespace"));
        assert_eq!(resolve_str("{{context.variables.user}}", &ctx), "from-node");
    }

    #[test]
    fn config_resolution_recurses_and_leaves_original_untouched() {
        let ctx = ctx_with("n1", json!({"v": "x"}));
        let config: Map<String, Value> = serde_json::from_value(json!({
            "url": "{{context.n1.v}}",
            "nested": {"list": ["{{context.n1.v}}", 7]}
        }))
        .unwrap();

        let resolved = resolve_config(&config, &ctx);
        assert_eq!(resolved["url"], "x");
        assert_eq!(resolved["nested"]["list"][0], "x");
        assert_eq!(resolved["nested"]["list"][1], 7);
        // source mapping is untouched
        assert_eq!(config["url"], "{{context.n1.v}}");
    }

    #[test]
    fn multiple_placeholders_resolve_independently() {
        let mut ctx = ctx_with("a", json!({"v": "1"}));
        ctx.set_result("b", json!({"v": "2"}));
        assert_eq!(
            resolve_str("{{context.a.v}}-{{context.b.v}}-{{context.c.v}}", &ctx),
            "1-2-[Node c not found]"
        );
    }
}
