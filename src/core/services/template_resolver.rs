use serde_json::{Map, Value};

use crate::core::errors::Defect;

/// Key that pulls named templates into an object.
pub const EXTENDS_KEY: &str = "extends";

/// Resolves `extends` references against a flat map of named templates.
///
/// Templates are merged in listed order, then the node's own keys are
/// merged on top, so the node always wins over its templates. Objects
/// merge key by key; everything else is replaced.
pub struct TemplateResolver<'a> {
    templates: &'a Map<String, Value>,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(templates: &'a Map<String, Value>) -> Self {
        Self { templates }
    }

    /// Resolve every `extends` in `node` and its descendants.
    ///
    /// # Errors
    ///
    /// Every defect found in the subtree, in walk order. Independent
    /// keys and array elements are all visited before failing.
    pub fn resolve(&self, node: &Map<String, Value>) -> Result<Map<String, Value>, Vec<Defect>> {
        let mut defects = Vec::new();
        let mut stack = Vec::new();
        let resolved = self.resolve_object(node, &mut stack, &mut defects);
        if defects.is_empty() {
            Ok(resolved)
        } else {
            Err(defects)
        }
    }

    fn resolve_object(
        &self,
        node: &Map<String, Value>,
        stack: &mut Vec<String>,
        defects: &mut Vec<Defect>,
    ) -> Map<String, Value> {
        let mut result = match node.get(EXTENDS_KEY) {
            Some(extends) => self.apply_templates(extends, stack, defects),
            None => Map::new(),
        };

        let mut own = Map::new();
        for (key, value) in node {
            if key == EXTENDS_KEY {
                continue;
            }
            own.insert(key.clone(), self.resolve_value(value, stack, defects));
        }
        deep_merge_into(&mut result, own);
        result
    }

    fn resolve_value(
        &self,
        value: &Value,
        stack: &mut Vec<String>,
        defects: &mut Vec<Defect>,
    ) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.resolve_object(map, stack, defects)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_value(item, stack, defects))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    /// Merge the templates named by an `extends` value, in listed order.
    fn apply_templates(
        &self,
        extends: &Value,
        stack: &mut Vec<String>,
        defects: &mut Vec<Defect>,
    ) -> Map<String, Value> {
        let mut merged = Map::new();

        let names: Vec<&str> = match extends {
            Value::String(name) => vec![name.as_str()],
            Value::Array(items) => match items.iter().map(Value::as_str).collect::<Option<_>>() {
                Some(names) => names,
                None => {
                    defects.push(Defect::InvalidExtends);
                    return merged;
                }
            },
            _ => {
                defects.push(Defect::InvalidExtends);
                return merged;
            }
        };

        for name in names {
            if stack.iter().any(|seen| seen == name) {
                let mut chain = stack.clone();
                chain.push(name.to_string());
                defects.push(Defect::CyclicTemplate { chain });
                continue;
            }

            let template = match self.lookup(name) {
                None | Some(Value::Null) => {
                    defects.push(Defect::UnknownTemplate {
                        name: name.to_string(),
                    });
                    continue;
                }
                Some(Value::Object(template)) => template,
                Some(_) => {
                    defects.push(Defect::InvalidTemplateType {
                        name: name.to_string(),
                    });
                    continue;
                }
            };

            stack.push(name.to_string());
            let resolved = self.resolve_object(template, stack, defects);
            stack.pop();

            deep_merge_into(&mut merged, resolved);
        }

        merged
    }

    /// Find a template by exact name, then as a dotted path into nested
    /// template groups (`db.postgres`).
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        if let Some(found) = self.templates.get(name) {
            return Some(found);
        }
        let mut parts = name.split('.');
        let mut current = self.templates.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

/// Deep-merge `overlay` into `base`.
/// If both sides have an object for the same key, recurse.
/// Otherwise `overlay`'s value wins. Arrays are replaced, never merged.
pub fn deep_merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match value {
            Value::Object(incoming) => match base.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge_into(existing, incoming),
                _ => {
                    base.insert(key, Value::Object(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
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

    fn templates() -> Map<String, Value> {
        object(json!({
            "db": {"host": "localhost", "pool": {"min": 1, "max": 5}},
            "cache": {"ttl": 60, "pool": {"max": 10}},
            "scalar": "not-an-object",
            "groups": {"web": {"port": 8080}}
        }))
    }

    #[test]
    fn node_without_extends_is_unchanged() {
        let tpl = templates();
        let node = object(json!({"a": 1, "b": {"c": [1, 2]}}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(Value::Object(resolved), Value::Object(node));
    }

    #[test]
    fn single_template_is_merged() {
        let tpl = templates();
        let node = object(json!({"database": {"extends": "db", "name": "orders"}}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(
            resolved["database"],
            json!({"host": "localhost", "pool": {"min": 1, "max": 5}, "name": "orders"})
        );
    }

    #[test]
    fn later_templates_win_and_objects_deep_merge() {
        let tpl = templates();
        let node = object(json!({"svc": {"extends": ["db", "cache"]}}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(
            resolved["svc"],
            json!({"host": "localhost", "pool": {"min": 1, "max": 10}, "ttl": 60})
        );
    }

    #[test]
    fn node_keys_override_templates() {
        let tpl = templates();
        let node = object(json!({"svc": {"host": "db.internal", "pool": {"min": 3}, "extends": "db"}}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(resolved["svc"]["host"], json!("db.internal"));
        assert_eq!(resolved["svc"]["pool"], json!({"min": 3, "max": 5}));
    }

    #[test]
    fn array_elements_are_resolved() {
        let tpl = templates();
        let node = object(json!({"servers": [{"extends": "groups.web"}, "plain", 3]}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(resolved["servers"], json!([{"port": 8080}, "plain", 3]));
    }

    #[test]
    fn invalid_extends_type_fails() {
        let tpl = templates();
        let node = object(json!({"a": {"extends": 5}}));

        let defects = TemplateResolver::new(&tpl).resolve(&node).unwrap_err();

        assert_eq!(defects, vec![Defect::InvalidExtends]);
    }

    #[test]
    fn array_with_non_string_fails() {
        let tpl = templates();
        let node = object(json!({"extends": ["db", 1]}));

        let defects = TemplateResolver::new(&tpl).resolve(&node).unwrap_err();

        assert_eq!(defects, vec![Defect::InvalidExtends]);
    }

    #[test]
    fn all_defects_are_collected() {
        let tpl = templates();
        let node = object(json!({
            "a": {"extends": "missing"},
            "b": [{"extends": "scalar"}],
            "c": {"extends": "db"}
        }));

        let defects = TemplateResolver::new(&tpl).resolve(&node).unwrap_err();

        assert_eq!(
            defects,
            vec![
                Defect::UnknownTemplate {
                    name: "missing".into()
                },
                Defect::InvalidTemplateType {
                    name: "scalar".into()
                },
            ]
        );
    }

    #[test]
    fn templates_may_extend_templates() {
        let tpl = object(json!({
            "base": {"timeout": 30},
            "http": {"extends": "base", "port": 80}
        }));
        let node = object(json!({"svc": {"extends": "http"}}));

        let resolved = TemplateResolver::new(&tpl).resolve(&node).unwrap();

        assert_eq!(resolved["svc"], json!({"timeout": 30, "port": 80}));
    }

    #[test]
    fn cyclic_templates_are_detected() {
        let tpl = object(json!({
            "a": {"extends": "b"},
            "b": {"extends": "a"}
        }));
        let node = object(json!({"svc": {"extends": "a"}}));

        let defects = TemplateResolver::new(&tpl).resolve(&node).unwrap_err();

        assert_eq!(
            defects,
            vec![Defect::CyclicTemplate {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }]
        );
    }

    #[test]
    fn deep_merge_replaces_arrays() {
        let mut base = object(json!({"list": [1, 2], "obj": {"x": 1}}));
        deep_merge_into(&mut base, object(json!({"list": [3], "obj": {"y": 2}})));

        assert_eq!(Value::Object(base), json!({"list": [3], "obj": {"x": 1, "y": 2}}));
    }
}
