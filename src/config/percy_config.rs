use serde::Deserialize;
use std::path::Path;

use crate::core::errors::{PercyError, Result};

pub const DEFAULT_VARIABLE_PREFIX: &str = "_{";
pub const DEFAULT_VARIABLE_SUFFIX: &str = "}_";
pub const DEFAULT_VARIABLE_NAME_PREFIX: &str = "$";
pub const DEFAULT_ENV_VARIABLE_NAME: &str = "env";

/// Substitution conventions used while resolving a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercyConfig {
    pub variable_prefix: String,
    pub variable_suffix: String,
    /// Top-level keys starting with this prefix are never emitted.
    pub variable_name_prefix: Option<String>,
    /// Name of the implicit token bound to the environment's own name.
    pub env_variable_name: String,
    pub env_ignore_prefix: Option<String>,
    pub env_ignore_suffix: Option<String>,
}

impl Default for PercyConfig {
    fn default() -> Self {
        Self {
            variable_prefix: DEFAULT_VARIABLE_PREFIX.to_string(),
            variable_suffix: DEFAULT_VARIABLE_SUFFIX.to_string(),
            variable_name_prefix: Some(DEFAULT_VARIABLE_NAME_PREFIX.to_string()),
            env_variable_name: DEFAULT_ENV_VARIABLE_NAME.to_string(),
            env_ignore_prefix: None,
            env_ignore_suffix: None,
        }
    }
}

impl PercyConfig {
    /// Built-in defaults, each overridable through a `PERCY_DEFAULT_*`
    /// environment variable.
    pub fn builtin() -> Self {
        Self::builtin_with(|key| std::env::var(key).ok())
    }

    /// Built-in defaults read through an arbitrary variable lookup.
    pub fn builtin_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let overrides = PercyConfigFile {
            variable_prefix: lookup("PERCY_DEFAULT_VARIABLE_PREFIX"),
            variable_suffix: lookup("PERCY_DEFAULT_VARIABLE_SUFFIX"),
            variable_name_prefix: lookup("PERCY_DEFAULT_VARIABLE_NAME_PREFIX"),
            env_variable_name: lookup("PERCY_DEFAULT_ENV_VARIABLE_NAME"),
            env_ignore_prefix: lookup("PERCY_DEFAULT_ENV_IGNORE_PREFIX"),
            env_ignore_suffix: lookup("PERCY_DEFAULT_ENV_IGNORE_SUFFIX"),
        };
        Self::default().overlay(&overrides)
    }

    /// Apply the keys set in `file` on top of this config.
    ///
    /// An empty string clears the optional keys.
    pub fn overlay(&self, file: &PercyConfigFile) -> Self {
        fn optional(current: &Option<String>, new: &Option<String>) -> Option<String> {
            match new {
                Some(v) if v.is_empty() => None,
                Some(v) => Some(v.clone()),
                None => current.clone(),
            }
        }

        Self {
            variable_prefix: file
                .variable_prefix
                .clone()
                .unwrap_or_else(|| self.variable_prefix.clone()),
            variable_suffix: file
                .variable_suffix
                .clone()
                .unwrap_or_else(|| self.variable_suffix.clone()),
            variable_name_prefix: optional(&self.variable_name_prefix, &file.variable_name_prefix),
            env_variable_name: file
                .env_variable_name
                .clone()
                .unwrap_or_else(|| self.env_variable_name.clone()),
            env_ignore_prefix: optional(&self.env_ignore_prefix, &file.env_ignore_prefix),
            env_ignore_suffix: optional(&self.env_ignore_suffix, &file.env_ignore_suffix),
        }
    }

    /// Load the config that applies to `folder`.
    ///
    /// Layers, later wins: `base`, the parent folder's config file
    /// (when `with_parent`), the folder's own config file.
    pub fn load_for_folder(
        base: &PercyConfig,
        folder: &Path,
        file_name: &str,
        with_parent: bool,
    ) -> Result<Self> {
        let mut config = base.clone();

        if with_parent
            && let Some(parent) = folder.parent()
            && let Some(file) = PercyConfigFile::load(&parent.join(file_name))?
        {
            config = config.overlay(&file);
        }

        if let Some(file) = PercyConfigFile::load(&folder.join(file_name))? {
            config = config.overlay(&file);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject delimiters that would make every string a placeholder.
    pub fn validate(&self) -> Result<()> {
        if self.variable_prefix.is_empty() || self.variable_suffix.is_empty() {
            return Err(PercyError::InvalidConfig {
                detail: "variablePrefix and variableSuffix must not be empty".into(),
            });
        }
        if self.env_variable_name.is_empty() {
            return Err(PercyError::InvalidConfig {
                detail: "envVariableName must not be empty".into(),
            });
        }
        Ok(())
    }

    /// True if output for `env` should not be written.
    ///
    /// With both a prefix and a suffix, only names matching both are
    /// ignored.
    pub fn is_env_ignored(&self, env: &str) -> bool {
        match (&self.env_ignore_prefix, &self.env_ignore_suffix) {
            (Some(prefix), Some(suffix)) => env.starts_with(prefix) && env.ends_with(suffix),
            (Some(prefix), None) => env.starts_with(prefix),
            (None, Some(suffix)) => env.ends_with(suffix),
            (None, None) => false,
        }
    }
}

/// A `.percyrc` file: every key optional, camelCase JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercyConfigFile {
    pub variable_prefix: Option<String>,
    pub variable_suffix: Option<String>,
    pub variable_name_prefix: Option<String>,
    pub env_variable_name: Option<String>,
    pub env_ignore_prefix: Option<String>,
    pub env_ignore_suffix: Option<String>,
}

impl PercyConfigFile {
    /// Read a config file, returning `None` if it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let file = serde_json::from_str(&content).map_err(|e| PercyError::ParseError {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded percy config");
        Ok(Some(file))
    }
}
