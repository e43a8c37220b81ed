//! Config command.

use std::path::PathBuf;

use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

/// Handle the `config` command.
pub fn cmd_config(configs: &[PathBuf]) -> i32 {
    match xcheck::load_config(configs).and_then(|store| xcheck::dump_store(&store)) {
        Ok(text) => {
            print!("{text}");
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            EXIT_FAILURE
        }
    }
}
