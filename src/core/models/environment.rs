use serde_json::{Map, Value};

/// An environment (dev, qat, prod) after inheritance has been applied,
/// before any variable substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEnvironment {
    pub name: String,
    pub node: Map<String, Value>,
    /// Inheritance chain from the root environment down to this one.
    pub layers: Vec<String>,
}
