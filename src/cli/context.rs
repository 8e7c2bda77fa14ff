use std::sync::OnceLock;

use crate::config::percy_config::PercyConfig;

/// Settings shared by every command, fixed once at startup.
#[derive(Debug, Clone)]
pub struct Context {
    pub env_file_name: String,
    pub config_file_name: String,
    /// Built-in defaults with `PERCY_DEFAULT_*` overrides applied.
    pub base_config: PercyConfig,
}

static CONTEXT: OnceLock<Context> = OnceLock::new();

/// Initialize the global context from the parsed CLI.
pub fn init(env_file_name: &str, config_file_name: &str) {
    let _ = CONTEXT.set(Context {
        env_file_name: env_file_name.to_string(),
        config_file_name: config_file_name.to_string(),
        base_config: PercyConfig::builtin(),
    });
}

/// Get the current context, falling back to built-in defaults.
pub fn get() -> &'static Context {
    CONTEXT.get_or_init(|| Context {
        env_file_name: "environments.yaml".to_string(),
        config_file_name: ".percyrc".to_string(),
        base_config: PercyConfig::builtin(),
    })
}
