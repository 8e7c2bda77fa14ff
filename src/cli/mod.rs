pub mod commands;
pub mod context;
pub mod output;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// Resolve layered YAML configuration into per-environment JSON.
#[derive(Parser, Debug)]
#[command(name = "percy", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug diagnostics on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Diagnostic log level or filter directive
    #[arg(long, global = true, env = "PERCY_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Name of the per-app environment list file
    #[arg(
        long,
        global = true,
        env = "PERCY_ENVIRONMENT_FILE_NAME",
        default_value = "environments.yaml"
    )]
    pub env_file_name: String,

    /// Name of the per-folder percy config file
    #[arg(
        long,
        global = true,
        env = "PERCY_CONFIG_FILE_NAME",
        default_value = ".percyrc"
    )]
    pub config_file_name: String,

    /// Colored console output (false, 0 or off to disable)
    #[arg(
        long,
        global = true,
        env = "PERCY_CONSOLE_COLORS",
        default_value = "true",
        action = clap::ArgAction::Set,
        value_parser = parse_switch
    )]
    pub console_colors: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve YAML configs and write one JSON file per environment
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["root", "app", "file"])
    ))]
    Hydrate {
        /// Folder whose sub-folders are apps
        #[arg(long)]
        root: Option<PathBuf>,
        /// App folder holding the environment file and YAML configs
        #[arg(long)]
        app: Option<PathBuf>,
        /// Single YAML config file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output folder
        #[arg(long, required_unless_present = "dry_run")]
        out: Option<PathBuf>,
        /// Resolve and report without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Also write a PlantUML inheritance diagram per file
        #[arg(long)]
        puml: bool,
    },

    /// Print the resolved config of one YAML file as JSON
    Resolve {
        /// YAML config file
        #[arg(long)]
        file: PathBuf,
        /// Environment(s) to resolve. Repeat: --env dev --env prod
        #[arg(long)]
        env: Vec<String>,
    },
}

/// Parse on/off style switches from flags and environment variables.
fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(format!("expected true/false, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn switches_accept_common_spellings() {
        assert_eq!(parse_switch("OFF"), Ok(false));
        assert_eq!(parse_switch("0"), Ok(false));
        assert_eq!(parse_switch("true"), Ok(true));
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn hydrate_requires_out_unless_dry_run() {
        assert!(Cli::try_parse_from(["percy", "hydrate", "--app", "a"]).is_err());
        assert!(Cli::try_parse_from(["percy", "hydrate", "--app", "a", "--dry-run"]).is_ok());
    }

    #[test]
    fn hydrate_targets_are_exclusive() {
        let result = Cli::try_parse_from([
            "percy", "hydrate", "--app", "a", "--file", "b.yaml", "--out", "o",
        ]);
        assert!(result.is_err());
    }
}
