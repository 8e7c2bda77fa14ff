use std::fs;
use std::path::{Path, PathBuf};

use crate::config::percy_config::PercyConfig;
use crate::core::errors::Result;
use crate::core::services::pipeline::Resolution;
use crate::core::traits::writer::OutputWriter;

/// Writes one pretty-printed JSON file per environment.
///
/// `app.yaml` resolved for `dev` lands in `{out_dir}/dev/app.json`.
/// Environments matching the configured ignore prefix/suffix are
/// resolved but never written.
pub struct JsonOutputWriter;

impl JsonOutputWriter {
    /// Output file path for one environment of `source`.
    pub fn output_path(source: &Path, out_dir: &Path, env: &str) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        out_dir.join(env).join(format!("{stem}.json"))
    }
}

impl OutputWriter for JsonOutputWriter {
    fn write(
        &self,
        resolution: &Resolution,
        source: &Path,
        out_dir: &Path,
        config: &PercyConfig,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for (env, node) in &resolution.environments {
            if config.is_env_ignored(env) {
                tracing::debug!(env = %env, "skipping ignored environment");
                continue;
            }

            let path = Self::output_path(source, out_dir, env);
            // Ensure the environment directory exists
            if let Some(parent) = path.parent()
                && !parent.exists()
            {
                fs::create_dir_all(parent)?;
            }

            let mut content = serde_json::to_string_pretty(node)?;
            content.push('\n');
            fs::write(&path, content)?;

            tracing::info!(path = %path.display(), "wrote resolved config");
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn resolution(value: Value) -> Resolution {
        Resolution {
            environments: value.as_object().cloned().unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn writes_one_file_per_environment() {
        let dir = tempfile::tempdir().unwrap();
        let res = resolution(json!({"dev": {"port": 1}, "prod": {"port": 2}}));

        let written = JsonOutputWriter
            .write(&res, Path::new("apps/app.yaml"), dir.path(), &PercyConfig::default())
            .unwrap();

        assert_eq!(written.len(), 2);
        let dev = std::fs::read_to_string(dir.path().join("dev").join("app.json")).unwrap();
        assert_eq!(dev, "{\n  \"port\": 1\n}\n");
        assert!(dir.path().join("prod").join("app.json").exists());
    }

    #[test]
    fn ignored_environments_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let res = resolution(json!({"_base_": {}, "prod": {}}));
        let config = PercyConfig {
            env_ignore_prefix: Some("_".into()),
            env_ignore_suffix: Some("_".into()),
            ..Default::default()
        };

        let written = JsonOutputWriter
            .write(&res, Path::new("app.yaml"), dir.path(), &config)
            .unwrap();

        assert_eq!(written, vec![dir.path().join("prod").join("app.json")]);
        assert!(!dir.path().join("_base_").exists());
    }

    #[test]
    fn key_order_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let res = resolution(json!({"dev": {"zeta": 1, "alpha": 2}}));

        JsonOutputWriter
            .write(&res, Path::new("x.yaml"), dir.path(), &PercyConfig::default())
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("dev").join("x.json")).unwrap();
        assert!(content.find("zeta").unwrap() < content.find("alpha").unwrap());
    }
}
