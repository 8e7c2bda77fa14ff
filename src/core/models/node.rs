use std::fmt;

use serde_json::Value;

/// Runtime kind of a configuration value.
///
/// Merging compares kinds, never values: an environment may only
/// override a property with a value of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// True for kinds that can become a substitution token.
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Join a parent property path and a key with a dot.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Key of the block that may introduce new properties in any environment.
pub const VARIABLES_KEY: &str = "variables";

/// True if `path` is the variables block or nested under it.
pub fn is_variables_path(path: &str) -> bool {
    path == VARIABLES_KEY
        || path
            .strip_prefix(VARIABLES_KEY)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_are_distinct_for_arrays_and_objects() {
        assert_eq!(ValueKind::of(&json!([])), ValueKind::Array);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Object);
        assert_ne!(ValueKind::of(&json!(1)), ValueKind::of(&json!("1")));
    }

    #[test]
    fn child_path_joins_with_dots() {
        assert_eq!(child_path("", "db"), "db");
        assert_eq!(child_path("db", "port"), "db.port");
    }

    #[test]
    fn variables_paths() {
        assert!(is_variables_path("variables"));
        assert!(is_variables_path("variables.host"));
        assert!(!is_variables_path("variablesExtra"));
        assert!(!is_variables_path("db.variables"));
    }
}
