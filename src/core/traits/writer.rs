use std::path::{Path, PathBuf};

use crate::config::percy_config::PercyConfig;
use crate::core::errors::Result;
use crate::core::services::pipeline::Resolution;

/// Port for emitting resolved environments.
pub trait OutputWriter: Send + Sync {
    /// Write every non-ignored environment of `resolution` for the
    /// document at `source` under `out_dir`. Returns the written paths.
    fn write(
        &self,
        resolution: &Resolution,
        source: &Path,
        out_dir: &Path,
        config: &PercyConfig,
    ) -> Result<Vec<PathBuf>>;
}
