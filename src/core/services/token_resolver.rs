use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::percy_config::PercyConfig;
use crate::core::errors::{Defect, PercyError, Result};
use crate::core::models::node::{VARIABLES_KEY, ValueKind};

/// Token name to its textual value.
pub type TokenTable = BTreeMap<String, String>;

/// Substitutes `prefix name suffix` placeholders in a merged environment
/// node.
///
/// Tokens come from the environment name, the node's top-level scalars
/// and the scalar entries of its `variables` block. Tokens may reference
/// each other; those references are resolved first, rejecting loops.
pub struct TokenResolver<'a> {
    config: &'a PercyConfig,
    pattern: Regex,
}

impl<'a> TokenResolver<'a> {
    pub fn new(config: &'a PercyConfig) -> Result<Self> {
        let source = format!(
            "{}(.+?){}",
            regex::escape(&config.variable_prefix),
            regex::escape(&config.variable_suffix)
        );
        let pattern = Regex::new(&source).map_err(|e| PercyError::InvalidConfig {
            detail: format!("invalid variable delimiters: {e}"),
        })?;
        Ok(Self { config, pattern })
    }

    /// Resolve every placeholder in `node` for environment `env`.
    ///
    /// The returned node has no `variables` key and, if a variable name
    /// prefix is configured, no top-level key starting with it.
    ///
    /// # Errors
    ///
    /// - `LoopVariableReference` / `CyclicVariableReference` if tokens
    ///   reference each other in a loop.
    /// - One `UnresolvedVariable` per placeholder naming an unknown token.
    pub fn resolve(
        &self,
        env: &str,
        node: &Map<String, Value>,
    ) -> std::result::Result<Map<String, Value>, Vec<Defect>> {
        let tokens = self.build_tokens(env, node);
        let tokens = self.resolve_tokens(tokens).map_err(|defect| vec![defect])?;
        tracing::debug!(env, tokens = tokens.len(), "tokens resolved");

        // Only emitted keys are substituted; the token table already
        // holds everything the stripped keys contribute.
        let scratch = self.config.variable_name_prefix.as_deref();
        let mut result = node.clone();
        result.retain(|key, _| {
            key != VARIABLES_KEY && !scratch.is_some_and(|prefix| key.starts_with(prefix))
        });

        let mut defects = Vec::new();
        for value in result.values_mut() {
            self.substitute_value(value, &tokens, &mut defects);
        }
        if !defects.is_empty() {
            return Err(defects);
        }
        Ok(result)
    }

    /// Collect the raw token table of a node.
    ///
    /// Later sources win: the environment name, then top-level scalars,
    /// then scalar entries of `variables`. Nulls are not tokens.
    pub fn build_tokens(&self, env: &str, node: &Map<String, Value>) -> TokenTable {
        let mut tokens = TokenTable::new();
        tokens.insert(self.config.env_variable_name.clone(), env.to_string());

        let variables = node.get(VARIABLES_KEY).and_then(Value::as_object);
        let top_level = node.iter().filter(|(key, _)| key.as_str() != VARIABLES_KEY);

        for (key, value) in top_level.chain(variables.into_iter().flatten()) {
            if let Some(text) = token_text(value) {
                tokens.insert(key.clone(), text);
            }
        }
        tokens
    }

    /// Resolve references between tokens until no token refers to another
    /// unresolved token.
    ///
    /// A reference to a token that is itself still unresolved is recorded
    /// as an edge instead of substituted; every recorded edge is checked
    /// for loops. Placeholders naming unknown tokens are left in place.
    pub fn resolve_tokens(&self, tokens: TokenTable) -> std::result::Result<TokenTable, Defect> {
        let mut resolved = tokens;
        let mut graph = ReferenceGraph::default();

        loop {
            let mut pending = false;
            let keys: Vec<String> = resolved.keys().cloned().collect();

            for key in keys {
                let value = resolved[&key].clone();
                let mut out = String::with_capacity(value.len());
                let mut last = 0;

                for caps in self.pattern.captures_iter(&value) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    out.push_str(&value[last..whole.start()]);
                    last = whole.end();

                    match resolved.get(name.as_str()) {
                        Some(target) if self.references_known(target, &resolved) => {
                            pending = true;
                            graph.add(&key, name.as_str())?;
                            out.push_str(whole.as_str());
                        }
                        Some(target) => out.push_str(target),
                        None => out.push_str(whole.as_str()),
                    }
                }
                out.push_str(&value[last..]);
                resolved.insert(key, out);
            }

            if !pending {
                return Ok(resolved);
            }
        }
    }

    fn references_known(&self, text: &str, tokens: &TokenTable) -> bool {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .any(|name| tokens.contains_key(name.as_str()))
    }

    fn substitute_value(&self, value: &mut Value, tokens: &TokenTable, defects: &mut Vec<Defect>) {
        match value {
            Value::Object(map) => {
                for child in map.values_mut() {
                    self.substitute_value(child, tokens, defects);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.substitute_value(item, tokens, defects);
                }
            }
            Value::String(text) => {
                if let Some(replaced) = self.substitute_str(text, tokens, defects) {
                    *text = replaced;
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Returns `None` if `text` has no placeholder.
    fn substitute_str(
        &self,
        text: &str,
        tokens: &TokenTable,
        defects: &mut Vec<Defect>,
    ) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut found = false;

        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            found = true;
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            match tokens.get(name.as_str()) {
                Some(token) => {
                    // Leftovers can only name unknown tokens
                    for inner in self.pattern.captures_iter(token).filter_map(|c| c.get(1)) {
                        defects.push(Defect::UnresolvedVariable {
                            name: inner.as_str().to_string(),
                        });
                    }
                    out.push_str(token);
                }
                None => defects.push(Defect::UnresolvedVariable {
                    name: name.as_str().to_string(),
                }),
            }
        }

        if !found {
            return None;
        }
        out.push_str(&text[last..]);
        Some(out)
    }
}

fn token_text(value: &Value) -> Option<String> {
    if !ValueKind::of(value).is_scalar() {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Directed graph of pending token references, built edge by edge.
#[derive(Debug, Default)]
struct ReferenceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceGraph {
    /// Record `from -> to`, failing if it closes a loop.
    fn add(&mut self, from: &str, to: &str) -> std::result::Result<(), Defect> {
        if from == to {
            return Err(Defect::LoopVariableReference {
                name: from.to_string(),
            });
        }
        if let Some(mut chain) = self.path(to, from) {
            chain.push(to.to_string());
            return Err(Defect::CyclicVariableReference { chain });
        }
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        Ok(())
    }

    /// Depth-first search for a path `start -> ... -> goal`.
    fn path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();
        let mut path = vec![start.to_string()];
        if self.walk(start, goal, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn walk(
        &self,
        current: &str,
        goal: &str,
        visited: &mut BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        if current == goal {
            return true;
        }
        if !visited.insert(current.to_string()) {
            return false;
        }
        for next in self.edges.get(current).into_iter().flatten() {
            path.push(next.clone());
            if self.walk(next, goal, visited, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn resolve(env: &str, node: Value) -> std::result::Result<Value, Vec<Defect>> {
        let config = PercyConfig::default();
        TokenResolver::new(&config)
            .unwrap()
            .resolve(env, &object(node))
            .map(Value::Object)
    }

    #[test]
    fn substitutes_variables_and_drops_block() {
        let out = resolve(
            "prod",
            json!({"host": "_{h}_", "variables": {"h": "api.example.com"}}),
        )
        .unwrap();

        assert_eq!(out, json!({"host": "api.example.com"}));
    }

    #[test]
    fn env_token_is_the_environment_name() {
        let out = resolve("qat", json!({"name": "_{env}_-svc"})).unwrap();
        assert_eq!(out, json!({"name": "qat-svc"}));
    }

    #[test]
    fn top_level_scalars_are_tokens() {
        let out = resolve(
            "dev",
            json!({"port": 8080, "secure": true, "url": "http://host:_{port}_/?tls=_{secure}_"}),
        )
        .unwrap();

        assert_eq!(out["url"], json!("http://host:8080/?tls=true"));
    }

    #[test]
    fn nested_values_and_arrays_are_substituted() {
        let out = resolve(
            "dev",
            json!({
                "db": {"urls": ["_{env}_-1", {"u": "_{env}_-2"}, [" _{env}_ "]], "n": 3},
                "variables": {"unused": ["a"]}
            }),
        )
        .unwrap();

        assert_eq!(
            out["db"],
            json!({"urls": ["dev-1", {"u": "dev-2"}, [" dev "]], "n": 3})
        );
    }

    #[test]
    fn transitive_references_resolve() {
        let out = resolve(
            "prod",
            json!({
                "url": "_{base}_/api",
                "variables": {"base": "https://_{host}_", "host": "_{sub}_.example.com", "sub": "_{env}_"}
            }),
        )
        .unwrap();

        assert_eq!(out["url"], json!("https://prod.example.com/api"));
    }

    #[test]
    fn self_reference_is_a_loop() {
        let err = resolve("dev", json!({"variables": {"a": "x-_{a}_"}})).unwrap_err();

        assert_eq!(err, vec![Defect::LoopVariableReference { name: "a".into() }]);
        assert_eq!(err[0].to_string(), "Loop variable reference: a->a");
    }

    #[test]
    fn three_token_cycle_reports_chain() {
        let err = resolve(
            "dev",
            json!({"variables": {"a": "_{b}_", "b": "_{c}_", "c": "_{a}_"}}),
        )
        .unwrap_err();

        assert_eq!(
            err,
            vec![Defect::CyclicVariableReference {
                chain: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            }]
        );
        assert_eq!(
            err[0].to_string(),
            "Cyclic variable reference detected: a->b->c->a"
        );
    }

    #[test]
    fn unknown_token_fails_and_is_never_emitted() {
        let err = resolve(
            "local",
            json!({"a": "_{undefined_variable}_", "b": ["_{other}_"], "c": "_{env}_"}),
        )
        .unwrap_err();

        assert_eq!(
            err,
            vec![
                Defect::UnresolvedVariable {
                    name: "undefined_variable".into()
                },
                Defect::UnresolvedVariable {
                    name: "other".into()
                },
            ]
        );
    }

    #[test]
    fn unknown_reference_inside_token_is_reported() {
        let err = resolve(
            "dev",
            json!({"url": "_{a}_", "variables": {"a": "_{b}_", "b": "x-_{missing}_"}}),
        )
        .unwrap_err();

        assert_eq!(
            err,
            vec![Defect::UnresolvedVariable {
                name: "missing".into()
            }]
        );
    }

    #[test]
    fn scratch_keys_are_dropped() {
        let out = resolve(
            "dev",
            json!({"$scratch": "internal", "name": "_{$scratch}_-svc"}),
        )
        .unwrap();

        assert_eq!(out, json!({"name": "internal-svc"}));
    }

    #[test]
    fn scratch_keys_kept_without_prefix() {
        let config = PercyConfig {
            variable_name_prefix: None,
            ..Default::default()
        };
        let out = TokenResolver::new(&config)
            .unwrap()
            .resolve("dev", &object(json!({"$scratch": "x"})))
            .unwrap();

        assert_eq!(Value::Object(out), json!({"$scratch": "x"}));
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let first = resolve(
            "prod",
            json!({"host": "_{h}_", "list": ["_{env}_"], "variables": {"h": "api"}}),
        )
        .unwrap();
        let second = resolve("prod", first.clone()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn custom_delimiters_are_escaped() {
        let config = PercyConfig {
            variable_prefix: "${".into(),
            variable_suffix: "}".into(),
            ..Default::default()
        };
        let out = TokenResolver::new(&config)
            .unwrap()
            .resolve("dev", &object(json!({"name": "${env}.svc", "raw": "_{env}_"})))
            .unwrap();

        assert_eq!(out["name"], json!("dev.svc"));
        assert_eq!(out["raw"], json!("_{env}_"));
    }

    #[test]
    fn variables_shadow_top_level_scalars() {
        let config = PercyConfig::default();
        let resolver = TokenResolver::new(&config).unwrap();
        let tokens = resolver.build_tokens(
            "dev",
            &object(json!({"host": "a", "list": [1], "variables": {"host": "b", "obj": {}, "nothing": null}})),
        );

        assert_eq!(tokens.get("host").map(String::as_str), Some("b"));
        assert_eq!(tokens.get("env").map(String::as_str), Some("dev"));
        assert!(!tokens.contains_key("list"));
        assert!(!tokens.contains_key("obj"));
        assert!(!tokens.contains_key("nothing"));
    }

    #[test]
    fn reference_graph_detects_cycle_through_existing_edges() {
        let mut graph = ReferenceGraph::default();
        graph.add("x", "y").unwrap();
        graph.add("y", "z").unwrap();

        let err = graph.add("z", "x").unwrap_err();

        assert_eq!(
            err,
            Defect::CyclicVariableReference {
                chain: vec!["x".into(), "y".into(), "z".into(), "x".into()]
            }
        );
    }
}
