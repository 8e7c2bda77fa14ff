use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::errors::{PercyError, Result};
use crate::core::traits::loader::DocumentLoader;

/// Folder holding `path`, `.` for bare file names.
pub fn folder_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Immediate sub-folders of `root`, sorted by name.
pub fn find_sub_folders(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PercyError::FileNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Config documents in `folder` the loader can read, sorted by name.
///
/// The environment file lives alongside the documents but is never one.
pub fn find_documents(
    folder: &Path,
    loader: &dyn DocumentLoader,
    env_file_name: &str,
) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PercyError::FileNotFound {
            path: folder.to_path_buf(),
        });
    }

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| loader.supported_extensions().contains(&ext));
        let is_env_file = path
            .file_name()
            .is_some_and(|name| name == env_file_name);
        if path.is_file() && supported && !is_env_file {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// Environments to resolve for a document that has no explicit list.
///
/// The sibling environment file wins; without one, the document's own
/// `environments` keys are used.
pub fn default_environments(
    document: &Value,
    folder: &Path,
    loader: &dyn DocumentLoader,
    env_file_name: &str,
) -> Result<Vec<String>> {
    let env_file = folder.join(env_file_name);
    if env_file.exists() {
        return loader.environment_names(&env_file);
    }
    Ok(document
        .get("environments")
        .and_then(Value::as_object)
        .map(|envs| envs.keys().cloned().collect())
        .unwrap_or_default())
}
