use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};

use crate::core::errors::{PercyError, Result};
use crate::core::traits::loader::DocumentLoader;

/// Key holding include directives in a document.
const INCLUDE_KEY: &str = "include";

/// Loads YAML configuration documents.
///
/// Supports:
/// - Anchors, aliases and `<<` merge keys
/// - `include: file.yaml`, `include: { local: file.yaml }` and lists of
///   both, paths relative to the including file
/// - Nested includes inside included files
///
/// Included files contribute templates; the document's own `templates`
/// win over included ones, and later includes win over earlier ones.
pub struct YamlDocumentLoader;

impl YamlDocumentLoader {
    /// Read a YAML file into the JSON value model, without includes.
    fn read(path: &Path) -> Result<Value> {
        if !path.exists() {
            return Err(PercyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        parse_yaml(&content).map_err(|detail| PercyError::ParseError {
            file: path.to_path_buf(),
            detail,
        })
    }

    /// Resolve an `include` value into a flat template map.
    fn load_include(&self, include: &Value, from: &Path, stack: &mut Vec<PathBuf>) -> Result<Map<String, Value>> {
        match include {
            Value::Null => Ok(Map::new()),
            Value::String(reference) if is_url(reference) => Err(PercyError::UnsupportedInclude {
                reference: reference.clone(),
            }),
            Value::String(local) => self.load_local(local, from, stack),
            Value::Array(items) => {
                let mut merged = Map::new();
                for item in items {
                    merged.extend(self.load_include(item, from, stack)?);
                }
                Ok(merged)
            }
            Value::Object(spec) => {
                if let Some(local) = spec.get("local").and_then(Value::as_str) {
                    self.load_local(local, from, stack)
                } else if let Some(remote) = spec.get("remote").and_then(Value::as_str) {
                    Err(PercyError::UnsupportedInclude {
                        reference: remote.to_string(),
                    })
                } else if let Some(project) = spec.get("project").and_then(Value::as_str) {
                    let file = spec.get("file").and_then(Value::as_str).unwrap_or_default();
                    Err(PercyError::UnsupportedInclude {
                        reference: format!("{project}/{file}"),
                    })
                } else {
                    Err(PercyError::ParseError {
                        file: from.to_path_buf(),
                        detail: "include object must be one of [local, remote, project]".into(),
                    })
                }
            }
            _ => Err(PercyError::ParseError {
                file: from.to_path_buf(),
                detail: "include must be a string, an object or a list".into(),
            }),
        }
    }

    /// Load an included file relative to the including one.
    fn load_local(&self, local: &str, from: &Path, stack: &mut Vec<PathBuf>) -> Result<Map<String, Value>> {
        let path = from.parent().unwrap_or(Path::new(".")).join(local);
        if stack.contains(&path) {
            let chain = stack
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(PercyError::ParseError {
                file: path,
                detail: format!("cyclic include detected: {chain}"),
            });
        }

        let Value::Object(mut included) = Self::read(&path)? else {
            return Err(PercyError::ParseError {
                file: path,
                detail: "included file must contain a mapping".into(),
            });
        };
        tracing::debug!(path = %path.display(), "loading include");

        stack.push(path.clone());
        let nested = match included.remove(INCLUDE_KEY) {
            Some(include) => self.load_include(&include, &path, stack)?,
            None => Map::new(),
        };
        stack.pop();

        let mut merged = nested;
        merged.extend(included);
        Ok(merged)
    }
}

impl DocumentLoader for YamlDocumentLoader {
    fn load(&self, path: &Path) -> Result<Value> {
        let mut document = Self::read(path)?;

        if let Value::Object(root) = &mut document
            && let Some(include) = root.remove(INCLUDE_KEY)
        {
            let mut stack = vec![path.to_path_buf()];
            let mut templates = self.load_include(&include, path, &mut stack)?;
            match root.remove("templates") {
                Some(Value::Object(own)) => templates.extend(own),
                Some(Value::Null) | None => {}
                Some(other) => {
                    // Leave it for shape validation to report
                    root.insert("templates".into(), other);
                    return Ok(document);
                }
            }
            root.insert("templates".into(), Value::Object(templates));
        }

        Ok(document)
    }

    fn environment_names(&self, path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Err(PercyError::EnvironmentFileMissing {
                path: path.to_path_buf(),
            });
        }
        let document = Self::read(path)?;
        match document.get("environments") {
            Some(Value::Object(envs)) => Ok(envs.keys().cloned().collect()),
            _ => Err(PercyError::ParseError {
                file: path.to_path_buf(),
                detail: "requires property \"environments\" of type object".into(),
            }),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml"]
    }
}

fn is_url(reference: &str) -> bool {
    reference
        .split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)))
}

/// Parse YAML text, apply `<<` merge keys and convert to JSON values.
pub fn parse_yaml(source: &str) -> std::result::Result<Value, String> {
    let mut yaml: YamlValue = serde_yaml::from_str(source).map_err(|e| e.to_string())?;
    yaml.apply_merge().map_err(|e| e.to_string())?;
    yaml_to_json(&yaml)
}

fn yaml_to_json(value: &YamlValue) -> std::result::Result<Value, String> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(*b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("unsupported number {n}"))?
            }
        }
        YamlValue::String(s) => Value::String(s.clone()),
        YamlValue::Sequence(items) => {
            Value::Array(items.iter().map(yaml_to_json).collect::<std::result::Result<_, _>>()?)
        }
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(mapping_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value)?,
    })
}

fn mapping_key(key: &YamlValue) -> std::result::Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".into()),
        other => Err(format!("unsupported mapping key: {other:?}")),
    }
}
