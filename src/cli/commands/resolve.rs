use std::path::Path;

use serde_json::Value;

use crate::adapters::loaders::yaml_loader::YamlDocumentLoader;
use crate::cli::commands::document_helpers;
use crate::cli::context;
use crate::config::percy_config::PercyConfig;
use crate::core::errors::Result;
use crate::core::services::pipeline::ResolutionPipeline;
use crate::core::traits::loader::DocumentLoader;

/// Execute the `percy resolve --file <yaml> [--env <name>]` command.
///
/// Prints the resolved config as pretty JSON on stdout: the bare node
/// for a single `--env`, otherwise a map keyed by environment. Nothing
/// is written to disk.
pub fn execute(file: &Path, envs: &[String]) -> Result<()> {
    let ctx = context::get();
    let loader = YamlDocumentLoader;
    let folder = document_helpers::folder_of(file);

    let config =
        PercyConfig::load_for_folder(&ctx.base_config, folder, &ctx.config_file_name, true)?;
    let document = loader.load(file)?;

    let envs = if envs.is_empty() {
        document_helpers::default_environments(&document, folder, &loader, &ctx.env_file_name)?
    } else {
        envs.to_vec()
    };
    tracing::debug!(file = %file.display(), envs = ?envs, "resolving");

    let mut resolution = ResolutionPipeline::new(&config).resolve(&document, &envs)?;

    let rendered = match envs.as_slice() {
        [single] => resolution
            .environments
            .remove(single)
            .unwrap_or(Value::Null),
        _ => Value::Object(resolution.environments),
    };
    println!("{}", serde_json::to_string_pretty(&rendered)?);

    Ok(())
}
