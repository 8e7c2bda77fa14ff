use std::path::{Path, PathBuf};

use crate::adapters::diagram::puml_exporter::PumlExporter;
use crate::adapters::loaders::yaml_loader::YamlDocumentLoader;
use crate::adapters::writers::json_writer::JsonOutputWriter;
use crate::cli::commands::document_helpers;
use crate::cli::context::{self, Context};
use crate::cli::output;
use crate::config::percy_config::PercyConfig;
use crate::core::errors::{PercyError, Result};
use crate::core::services::pipeline::ResolutionPipeline;
use crate::core::traits::loader::DocumentLoader;
use crate::core::traits::writer::OutputWriter;

/// What `percy hydrate` was pointed at.
pub enum Target<'a> {
    Root(&'a Path),
    App(&'a Path),
    File(&'a Path),
}

/// Execute the `percy hydrate` command.
///
/// With `out` unset (dry run) every document is resolved and checked,
/// but nothing is written.
pub fn execute(target: Target<'_>, out: Option<&Path>, puml: bool) -> Result<()> {
    let ctx = context::get();
    if out.is_none() {
        output::warning("Dry run: resolved configs will not be written");
    }
    let mut writers: Vec<Box<dyn OutputWriter>> = vec![Box::new(JsonOutputWriter)];
    if puml {
        writers.push(Box::new(PumlExporter));
    }
    let hydrator = Hydrator {
        ctx,
        loader: &YamlDocumentLoader,
        writers,
    };

    match target {
        Target::Root(root) => {
            output::header(&format!("Hydrating apps in {}", root.display()));
            hydrator.hydrate_all_apps(root, out)
        }
        Target::App(app) => {
            output::header(&format!("Hydrating app {}", app.display()));
            hydrator.hydrate_app(app, None, out)
        }
        Target::File(file) => {
            output::header(&format!("Hydrating {}", file.display()));
            hydrator.hydrate_file(file, None, None, out)
        }
    }
}

/// Resolves documents and hands the results to the output writers.
pub struct Hydrator<'a> {
    pub ctx: &'a Context,
    pub loader: &'a dyn DocumentLoader,
    pub writers: Vec<Box<dyn OutputWriter>>,
}

impl Hydrator<'_> {
    /// Hydrate every app folder under `root`.
    ///
    /// The root config file is read once; each app's own config file
    /// overlays it. Output for app `web` goes to `{out}/web`.
    pub fn hydrate_all_apps(&self, root: &Path, out: Option<&Path>) -> Result<()> {
        let config = PercyConfig::load_for_folder(
            &self.ctx.base_config,
            root,
            &self.ctx.config_file_name,
            false,
        )?;

        let mut failed = Vec::new();
        for folder in document_helpers::find_sub_folders(root)? {
            let app_out = match (out, folder.file_name()) {
                (Some(out), Some(name)) => Some(out.join(name)),
                _ => None,
            };
            match self.hydrate_app(&folder, Some(&config), app_out.as_deref()) {
                Ok(()) => {}
                // File failures were already reported one by one
                Err(PercyError::ProcessingFailed { .. }) => failed.push(folder),
                Err(e) => {
                    output::error(&format!("{}: {e}", folder.display()));
                    failed.push(folder);
                }
            }
        }

        if !failed.is_empty() {
            return Err(PercyError::ProcessingFailed {
                kind: "app folders".into(),
                items: join_paths(&failed),
            });
        }
        output::success(&format!("Processed all apps in {}", root.display()));
        Ok(())
    }

    /// Hydrate every document in one app folder.
    ///
    /// Without a `config` from the caller, the parent folder's config
    /// file is layered under the app's own.
    pub fn hydrate_app(
        &self,
        folder: &Path,
        config: Option<&PercyConfig>,
        out: Option<&Path>,
    ) -> Result<()> {
        let (base, with_parent) = match config {
            Some(config) => (config, false),
            None => (&self.ctx.base_config, true),
        };
        let config = PercyConfig::load_for_folder(
            base,
            folder,
            &self.ctx.config_file_name,
            with_parent,
        )?;
        let environments = self
            .loader
            .environment_names(&folder.join(&self.ctx.env_file_name))?;
        let documents =
            document_helpers::find_documents(folder, self.loader, &self.ctx.env_file_name)?;

        let mut failed = Vec::new();
        for document in documents {
            if let Err(e) = self.hydrate_file(&document, Some(&environments), Some(&config), out) {
                output::error(&format!("{}: {e}", document.display()));
                failed.push(document);
            }
        }

        if !failed.is_empty() {
            return Err(PercyError::ProcessingFailed {
                kind: "files".into(),
                items: join_paths(&failed),
            });
        }
        output::success(&format!(
            "Processed all config files in {}",
            folder.display()
        ));
        Ok(())
    }

    /// Resolve one document and write its outputs.
    ///
    /// Environments default to the sibling environment file and the
    /// config to the layered config files around the document.
    pub fn hydrate_file(
        &self,
        file: &Path,
        environments: Option<&[String]>,
        config: Option<&PercyConfig>,
        out: Option<&Path>,
    ) -> Result<()> {
        let folder = document_helpers::folder_of(file);

        let owned_envs;
        let environments = match environments {
            Some(envs) => envs,
            None => {
                owned_envs = self
                    .loader
                    .environment_names(&folder.join(&self.ctx.env_file_name))?;
                owned_envs.as_slice()
            }
        };
        let owned_config;
        let config = match config {
            Some(config) => config,
            None => {
                owned_config = PercyConfig::load_for_folder(
                    &self.ctx.base_config,
                    folder,
                    &self.ctx.config_file_name,
                    true,
                )?;
                &owned_config
            }
        };

        let document = self.loader.load(file)?;
        let resolution = ResolutionPipeline::new(config).resolve(&document, environments)?;

        let mut written: Vec<PathBuf> = Vec::new();
        if let Some(out) = out {
            for writer in &self.writers {
                written.extend(writer.write(&resolution, file, out, config)?);
            }
        }

        output::success(&format!(
            "{}: {} environment(s) resolved, {} file(s) written",
            file.display(),
            resolution.environments.len(),
            written.len()
        ));
        for path in &written {
            output::item(&path.display().to_string());
        }
        Ok(())
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
