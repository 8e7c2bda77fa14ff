use serde_json::{Map, Value};

use crate::core::errors::{Defect, Issue, ResolutionError};
use crate::core::models::node::ValueKind;

/// A parsed source document, validated for shape.
///
/// `include` directives are inlined into `templates` by the document
/// loader, so the engine never sees them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub default: Map<String, Value>,
    pub environments: Map<String, Value>,
    pub templates: Map<String, Value>,
}

impl AppConfig {
    /// Validate a raw document and split it into its sections.
    ///
    /// `default` and `environments` are required objects, `templates`
    /// is an optional object. Every shape defect is reported at once.
    pub fn from_value(document: &Value) -> Result<Self, ResolutionError> {
        let Value::Object(root) = document else {
            return Err(ResolutionError::new(vec![Issue::document(
                Defect::InvalidSectionType {
                    section: "document".into(),
                    expected: "object".into(),
                },
            )]));
        };

        let mut issues = Vec::new();
        let default = required_object(root, "default", &mut issues);
        let environments = required_object(root, "environments", &mut issues);
        let templates = match root.get("templates") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                issues.push(Issue::document(Defect::InvalidSectionType {
                    section: "templates".into(),
                    expected: "object".into(),
                }));
                Map::new()
            }
        };

        ResolutionError::check(issues)?;
        Ok(Self {
            default,
            environments,
            templates,
        })
    }
}

fn required_object(
    root: &Map<String, Value>,
    section: &str,
    issues: &mut Vec<Issue>,
) -> Map<String, Value> {
    match root.get(section) {
        Some(Value::Object(map)) => map.clone(),
        None => {
            issues.push(Issue::document(Defect::MissingRequiredSection {
                section: section.to_string(),
            }));
            Map::new()
        }
        Some(other) => {
            issues.push(Issue::document(Defect::InvalidSectionType {
                section: section.to_string(),
                expected: ValueKind::Object.to_string(),
            }));
            tracing::debug!(section, kind = %ValueKind::of(other), "section has wrong kind");
            Map::new()
        }
    }
}
