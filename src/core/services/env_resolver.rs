use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::core::errors::{Defect, Issue, ResolutionError};
use crate::core::models::environment::MergedEnvironment;
use crate::core::models::node::{ValueKind, child_path, is_variables_path};

/// Key naming the parent environment.
pub const INHERITS_KEY: &str = "inherits";

/// Resolves environment inheritance (default -> qat -> dev).
///
/// Environments without `inherits` are merged onto `default`; the others
/// onto their already merged parent. An environment may only override
/// properties its parent has, with a value of the same kind, except
/// inside `variables` where new keys are always allowed.
pub struct EnvResolver;

impl EnvResolver {
    /// Order and merge the requested environments.
    ///
    /// The result holds every environment in processing order, including
    /// ancestors that were not requested themselves.
    ///
    /// # Errors
    ///
    /// - `CyclicInheritance` for every requested environment whose chain
    ///   loops. No merge is attempted in that case.
    /// - Every merge defect of every environment otherwise.
    pub fn resolve(
        &self,
        requested: &[String],
        default: &Map<String, Value>,
        environments: &Map<String, Value>,
    ) -> Result<Vec<MergedEnvironment>, ResolutionError> {
        let order = self.processing_order(requested, environments)?;
        let mut issues = Vec::new();
        let merged = self.merge_all(&order, default, environments, &mut HashSet::new(), &mut issues);
        ResolutionError::check(issues)?;
        Ok(merged)
    }

    /// Build the processing order: every ancestor before its children.
    ///
    /// For `dev` with `inherits = "qat"` and `qat` with no parent,
    /// returns `["qat", "dev"]`.
    pub fn processing_order(
        &self,
        requested: &[String],
        environments: &Map<String, Value>,
    ) -> Result<Vec<String>, ResolutionError> {
        let mut ordered: Vec<String> = Vec::new();
        let mut issues = Vec::new();

        for env in requested {
            if ordered.contains(env) {
                continue;
            }

            // Walk upward collecting ancestors
            let mut stack = vec![env.clone()];
            let mut cyclic = false;
            while let Some(parent) = stack.last().and_then(|name| parent_of(environments, name)) {
                let seen = stack.iter().any(|name| name == parent);
                stack.push(parent.to_string());
                if seen {
                    issues.push(Issue::in_env(
                        env,
                        Defect::CyclicInheritance {
                            chain: stack.clone(),
                        },
                    ));
                    cyclic = true;
                    break;
                }
            }
            if cyclic {
                continue;
            }

            // Root first, leaf last
            for name in stack.into_iter().rev() {
                if !ordered.contains(&name) {
                    ordered.push(name);
                }
            }
        }

        ResolutionError::check(issues)?;
        tracing::debug!(order = ?ordered, "environment processing order");
        Ok(ordered)
    }

    /// Merge every environment in `order`, recording defects in `issues`.
    ///
    /// Environments listed in `failed` are skipped, and so are their
    /// descendants; each environment that fails here is added to it.
    /// Only environments that merged cleanly are returned.
    pub fn merge_all(
        &self,
        order: &[String],
        default: &Map<String, Value>,
        environments: &Map<String, Value>,
        failed: &mut HashSet<String>,
        issues: &mut Vec<Issue>,
    ) -> Vec<MergedEnvironment> {
        let mut merged: Vec<MergedEnvironment> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for name in order {
            if failed.contains(name) {
                continue;
            }

            match self.merge_one(name, default, environments, &merged, &index) {
                Ok(env) => {
                    index.insert(name.clone(), merged.len());
                    merged.push(env);
                }
                Err(defects) => {
                    tracing::debug!(env = %name, defects = defects.len(), "environment failed to merge");
                    failed.insert(name.clone());
                    issues.extend(defects.into_iter().map(|d| Issue::in_env(name, d)));
                }
            }
        }

        merged
    }

    fn merge_one(
        &self,
        name: &str,
        default: &Map<String, Value>,
        environments: &Map<String, Value>,
        merged: &[MergedEnvironment],
        index: &HashMap<String, usize>,
    ) -> Result<MergedEnvironment, Vec<Defect>> {
        let empty = Map::new();
        let own = match environments.get(name) {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(node)) => node,
            Some(other) => {
                return Err(vec![Defect::InvalidEnvironmentNode {
                    kind: ValueKind::of(other).to_string(),
                }]);
            }
        };

        let (mut node, mut layers) = match own.get(INHERITS_KEY) {
            None | Some(Value::Null) => (default.clone(), Vec::new()),
            Some(Value::String(parent)) => {
                // Parents are ordered first, so a missing one has failed
                let Some(parent_env) = index.get(parent).map(|&i| &merged[i]) else {
                    return Err(vec![Defect::ParentFailed {
                        parent: parent.clone(),
                    }]);
                };
                (parent_env.node.clone(), parent_env.layers.clone())
            }
            Some(other) => {
                return Err(vec![Defect::InvalidInherits {
                    kind: ValueKind::of(other).to_string(),
                }]);
            }
        };

        let mut defects = Vec::new();
        Self::merge_properties(&mut node, own, "", &mut defects);
        if !defects.is_empty() {
            return Err(defects);
        }

        layers.push(name.to_string());
        Ok(MergedEnvironment {
            name: name.to_string(),
            node,
            layers,
        })
    }

    /// Merge `src` onto `dest`, checking that every property exists in
    /// `dest` with the same kind.
    ///
    /// 1. `inherits` is skipped at every depth.
    /// 2. Unknown keys fail, unless under `variables`.
    /// 3. Objects recurse; any other value replaces the parent's.
    fn merge_properties(
        dest: &mut Map<String, Value>,
        src: &Map<String, Value>,
        prefix: &str,
        defects: &mut Vec<Defect>,
    ) {
        for (key, value) in src {
            if key == INHERITS_KEY {
                continue;
            }
            let path = child_path(prefix, key);

            match dest.get_mut(key) {
                None => {
                    if is_variables_path(&path) {
                        dest.insert(key.clone(), value.clone());
                    } else {
                        defects.push(Defect::UnknownProperty { path });
                    }
                }
                Some(existing) => {
                    if ValueKind::of(existing) != ValueKind::of(value) {
                        defects.push(Defect::TypeMismatch { path });
                        continue;
                    }
                    match (existing, value) {
                        (Value::Object(existing), Value::Object(incoming)) => {
                            Self::merge_properties(existing, incoming, &path, defects);
                        }
                        (slot, value) => *slot = value.clone(),
                    }
                }
            }
        }
    }
}

fn parent_of<'a>(environments: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    environments
        .get(name)
        .and_then(|node| node.get(INHERITS_KEY))
        .and_then(Value::as_str)
}
