mod adapters;
mod cli;
mod config;
mod core;
mod logging;

use clap::Parser;

use cli::commands::hydrate::Target;
use cli::{Cli, Commands};

fn main() {
    let args = Cli::parse();

    cli::output::set_colors(args.console_colors);
    if let Err(e) = logging::init(&args.log_level, args.verbose) {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
    cli::context::init(&args.env_file_name, &args.config_file_name);

    let result = match &args.command {
        Commands::Hydrate {
            root,
            app,
            file,
            out,
            dry_run,
            puml,
        } => {
            // clap guarantees exactly one target
            let target = match (root, app, file) {
                (Some(root), _, _) => Target::Root(root),
                (_, Some(app), _) => Target::App(app),
                (_, _, Some(file)) => Target::File(file),
                _ => unreachable!("hydrate target group is required"),
            };
            let out = if *dry_run { None } else { out.as_deref() };
            cli::commands::hydrate::execute(target, out, *puml)
        }
        Commands::Resolve { file, env } => cli::commands::resolve::execute(file, env),
    };

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
