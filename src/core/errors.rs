use std::fmt;
use std::path::PathBuf;

/// All errors the `percy` binary can report.
///
/// Each variant provides enough context to fix the input without
/// needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum PercyError {
    #[error(
        "File not found: {path}\n\n  \
         Check that the path is correct and the file exists."
    )]
    FileNotFound { path: PathBuf },

    #[error(
        "Environment file '{path}' doesn't exist\n\n  \
         Every app folder needs an environment file listing its environments:\n    \
         environments:\n      \
           dev: {{}}\n      \
           prod: {{}}\n  \
         Override the file name with PERCY_ENVIRONMENT_FILE_NAME."
    )]
    EnvironmentFileMissing { path: PathBuf },

    #[error("Parse error in {file}: {detail}")]
    ParseError { file: PathBuf, detail: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Unsupported include '{reference}'\n\n  \
         Only local includes are resolved:\n    \
         → include: common.yaml\n    \
         → include: {{ local: common.yaml }}"
    )]
    UnsupportedInclude { reference: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Error occurred while processing {kind}: {items}")]
    ProcessingFailed { kind: String, items: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PercyError>;

/// A single defect found while resolving a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Defect {
    #[error("requires property \"{section}\"")]
    MissingRequiredSection { section: String },

    #[error("property \"{section}\" is not of a type(s) {expected}")]
    InvalidSectionType { section: String, expected: String },

    #[error("the extends value must be array or string")]
    InvalidExtends,

    #[error("the extends value {name} doesn't exist")]
    UnknownTemplate { name: String },

    #[error("the extends value {name} isn't an object")]
    InvalidTemplateType { name: String },

    #[error("Cyclic template extension detected: {}", .chain.join(" -> "))]
    CyclicTemplate { chain: Vec<String> },

    #[error("the environment node must be an object, found {kind}")]
    InvalidEnvironmentNode { kind: String },

    #[error("the inherits value must be a string, found {kind}")]
    InvalidInherits { kind: String },

    #[error("Cannot find property {path} in this node")]
    UnknownProperty { path: String },

    #[error("Type is different from default node for property {path} in this node")]
    TypeMismatch { path: String },

    #[error("Cyclic environment inheritance detected: {}", .chain.join(" -> "))]
    CyclicInheritance { chain: Vec<String> },

    #[error("Cannot merge onto environment {parent} which failed to resolve")]
    ParentFailed { parent: String },

    #[error("Loop variable reference: {name}->{name}")]
    LoopVariableReference { name: String },

    #[error("Cyclic variable reference detected: {}", .chain.join("->"))]
    CyclicVariableReference { chain: Vec<String> },

    #[error("Cannot resolve variables for: {name}")]
    UnresolvedVariable { name: String },
}

/// A defect together with the environment it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub env: Option<String>,
    pub defect: Defect,
}

impl Issue {
    /// A document-level issue not tied to any environment.
    pub fn document(defect: Defect) -> Self {
        Self { env: None, defect }
    }

    pub fn in_env(env: &str, defect: Defect) -> Self {
        Self {
            env: Some(env.to_string()),
            defect,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.env {
            Some(env) => write!(f, "env.{env}: {}", self.defect),
            None => write!(f, "{}", self.defect),
        }
    }
}

/// Every defect found in one resolution pass, in discovery order.
///
/// The engine never stops at the first defect: independent keys,
/// array elements and environments are all checked, so one run
/// reports everything that needs fixing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionError {
    pub issues: Vec<Issue>,
}

impl ResolutionError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Rendered, prefixed messages in discovery order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// Returns `Err` if any issue has been collected.
    pub fn check(issues: Vec<Issue>) -> std::result::Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self::new(issues))
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration could not be resolved ({} issue(s))", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n    → {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionError {}
