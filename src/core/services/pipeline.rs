use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::config::percy_config::PercyConfig;
use crate::core::errors::{Issue, ResolutionError, Result};
use crate::core::models::app_config::AppConfig;
use crate::core::services::env_resolver::EnvResolver;
use crate::core::services::template_resolver::TemplateResolver;
use crate::core::services::token_resolver::TokenResolver;

/// Result of resolving one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// The `default` section after template resolution.
    pub default: Map<String, Value>,
    /// Environment name to fully resolved config, in processing order.
    pub environments: Map<String, Value>,
    /// Inheritance chain of each resolved environment, root first.
    pub layers: BTreeMap<String, Vec<String>>,
}

/// Turns a parsed document into one resolved config per environment.
///
/// Stages: shape validation, `extends` templates, inheritance, tokens.
/// Shape defects abort the whole document, and `default` template
/// defects abort it once every environment's templates are checked. Any
/// other defect only stops its own environment (and the environments
/// inheriting from it), but the document still fails as a whole with
/// every defect listed.
pub struct ResolutionPipeline<'a> {
    config: &'a PercyConfig,
}

impl<'a> ResolutionPipeline<'a> {
    pub fn new(config: &'a PercyConfig) -> Self {
        Self { config }
    }

    /// Resolve `requested` environments of `document`.
    ///
    /// Ancestors of requested environments are resolved and returned too.
    pub fn resolve(&self, document: &Value, requested: &[String]) -> Result<Resolution> {
        let app = AppConfig::from_value(document)?;
        let templates = TemplateResolver::new(&app.templates);

        let mut issues = Vec::new();
        let default = match templates.resolve(&app.default) {
            Ok(default) => Some(default),
            Err(defects) => {
                issues.extend(defects.into_iter().map(|d| Issue::in_env("default", d)));
                None
            }
        };

        let mut failed = HashSet::new();
        let mut environments = Map::new();
        for (name, node) in &app.environments {
            let resolved = match node {
                Value::Object(node) => match templates.resolve(node) {
                    Ok(resolved) => Value::Object(resolved),
                    Err(defects) => {
                        failed.insert(name.clone());
                        issues.extend(defects.into_iter().map(|d| Issue::in_env(name, d)));
                        continue;
                    }
                },
                other => other.clone(),
            };
            environments.insert(name.clone(), resolved);
        }

        // Nothing can merge onto a broken default
        let Some(default) = default else {
            return Err(ResolutionError::new(issues).into());
        };

        // Ordered from the declared nodes, so environments whose
        // templates failed still take part in cycle detection
        let resolver = EnvResolver;
        let order = match resolver.processing_order(requested, &app.environments) {
            Ok(order) => order,
            Err(cycles) => {
                issues.extend(cycles.issues);
                return Err(ResolutionError::new(issues).into());
            }
        };
        let merged = resolver.merge_all(&order, &default, &environments, &mut failed, &mut issues);

        let tokens = TokenResolver::new(self.config)?;
        let mut resolution = Resolution {
            default,
            ..Default::default()
        };
        for env in merged {
            match tokens.resolve(&env.name, &env.node) {
                Ok(node) => {
                    resolution
                        .environments
                        .insert(env.name.clone(), Value::Object(node));
                    resolution.layers.insert(env.name, env.layers);
                }
                Err(defects) => {
                    issues.extend(defects.into_iter().map(|d| Issue::in_env(&env.name, d)));
                }
            }
        }

        ResolutionError::check(issues)?;
        tracing::debug!(
            environments = resolution.environments.len(),
            "document resolved"
        );
        Ok(resolution)
    }
}
