//! Command implementations.

mod config;
mod djb2;
mod instrument;
mod resolve;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Instrument {
            configs,
            unit,
            output,
            engine,
            strict,
        } => instrument::cmd_instrument(configs, unit, output, &engine.options(), *strict),
        Commands::Resolve {
            configs,
            file,
            function,
            unit,
            arg,
            site,
            engine,
        } => resolve::cmd_resolve(
            configs,
            file,
            function,
            unit.as_deref(),
            &site.point(arg.as_deref()),
            &engine.options(),
        ),
        Commands::Config { configs } => config::cmd_config(configs),
        Commands::Djb2 { input } => djb2::cmd_djb2(input),
    }
}
