use std::path::Path;

use serde_json::Value;

use crate::core::errors::Result;

/// Port for turning a configuration file into a plain document.
///
/// Implementations must inline `include` directives into `templates`,
/// so the resolution engine only ever sees nested data.
pub trait DocumentLoader: Send + Sync {
    /// Load and parse the document at `path`.
    fn load(&self, path: &Path) -> Result<Value>;

    /// Environment names listed by the environment file at `path`.
    fn environment_names(&self, path: &Path) -> Result<Vec<String>>;

    /// File extensions this loader handles (e.g. `["yaml"]`).
    fn supported_extensions(&self) -> &[&str];
}
