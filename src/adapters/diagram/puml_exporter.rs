use std::fs;
use std::path::{Path, PathBuf};

use crate::config::percy_config::PercyConfig;
use crate::core::errors::Result;
use crate::core::services::pipeline::Resolution;
use crate::core::traits::writer::OutputWriter;

/// Writes a PlantUML class diagram of the environment inheritance tree.
///
/// Output goes to `{out_dir}/{stem}.puml` as plain text; rendering to an
/// image is left to PlantUML itself.
pub struct PumlExporter;

impl PumlExporter {
    /// Render the diagram source for one resolved document.
    pub fn render(resolution: &Resolution, config: &PercyConfig) -> String {
        let environments: Vec<&str> = resolution
            .environments
            .keys()
            .map(String::as_str)
            .filter(|env| !config.is_env_ignored(env))
            .collect();

        let mut lines = vec!["@startuml".to_string()];
        for env in &environments {
            let parent = resolution
                .layers
                .get(*env)
                .and_then(|layers| layers.len().checked_sub(2).map(|i| layers[i].as_str()))
                .filter(|parent| environments.contains(parent))
                .unwrap_or("default");
            lines.push(format!("{parent} <|-- {env}"));
        }
        for key in resolution.default.keys() {
            lines.push(format!("default : {key}"));
        }
        for env in &environments {
            if let Some(node) = resolution.environments[*env].as_object() {
                for key in node.keys() {
                    lines.push(format!("{env} : {key}"));
                }
            }
        }
        lines.push("@enduml".to_string());
        lines.join("\n")
    }
}

impl OutputWriter for PumlExporter {
    fn write(
        &self,
        resolution: &Resolution,
        source: &Path,
        out_dir: &Path,
        config: &PercyConfig,
    ) -> Result<Vec<PathBuf>> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        let path = out_dir.join(format!("{stem}.puml"));

        fs::create_dir_all(out_dir)?;
        fs::write(&path, Self::render(resolution, config) + "\n")?;

        tracing::info!(path = %path.display(), "wrote inheritance diagram");
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Resolution {
        let mut resolution = Resolution {
            default: json!({"host": "x", "port": 1}).as_object().cloned().unwrap(),
            environments: json!({
                "_base_": {"host": "b"},
                "qat": {"port": 2},
                "dev": {"port": 3}
            })
            .as_object()
            .cloned()
            .unwrap(),
            ..Default::default()
        };
        resolution.layers.insert("_base_".into(), vec!["_base_".into()]);
        resolution.layers.insert("qat".into(), vec!["_base_".into(), "qat".into()]);
        resolution
            .layers
            .insert("dev".into(), vec!["_base_".into(), "qat".into(), "dev".into()]);
        resolution
    }

    #[test]
    fn renders_inheritance_and_keys() {
        let text = PumlExporter::render(&sample(), &PercyConfig::default());

        assert_eq!(
            text,
            [
                "@startuml",
                "default <|-- _base_",
                "_base_ <|-- qat",
                "qat <|-- dev",
                "default : host",
                "default : port",
                "_base_ : host",
                "qat : port",
                "dev : port",
                "@enduml",
            ]
            .join("\n")
        );
    }

    #[test]
    fn ignored_parents_fall_back_to_default() {
        let config = PercyConfig {
            env_ignore_prefix: Some("_".into()),
            env_ignore_suffix: Some("_".into()),
            ..Default::default()
        };

        let text = PumlExporter::render(&sample(), &config);

        assert!(text.contains("default <|-- qat"));
        assert!(!text.contains("_base_"));
    }

    #[test]
    fn writes_diagram_next_to_outputs() {
        let dir = tempfile::tempdir().unwrap();

        let written = PumlExporter
            .write(&sample(), Path::new("app.yaml"), dir.path(), &PercyConfig::default())
            .unwrap();

        assert_eq!(written, vec![dir.path().join("app.puml")]);
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.starts_with("@startuml\n"));
    }
}
