//! Instrument command.

use std::path::{Path, PathBuf};

use tracing::{error, info};
use xcheck::EngineOptions;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `instrument` command.
pub fn cmd_instrument(
    configs: &[PathBuf],
    unit: &Path,
    output: &Path,
    options: &EngineOptions,
    strict: bool,
) -> i32 {
    info!(unit = %unit.display(), output = %output.display(), "instrumenting");

    let result = xcheck::load_config(configs).and_then(|store| {
        let unit = xcheck::load_unit(unit)?;
        xcheck::instrument(&store, &unit, output, options)
    });
    match result {
        Ok(out) => {
            let summary = &out.summary;
            println!(
                "{}: {} functions, {} checks, {} routines, {} diagnostics",
                out.header.display(),
                summary.functions,
                summary.checks,
                summary.routines,
                summary.diagnostics
            );
            if strict && out.has_errors() {
                error!(diagnostics = summary.diagnostics, "checks were dropped");
                return EXIT_FAILURE;
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "instrumentation failed");
            EXIT_FAILURE
        }
    }
}
