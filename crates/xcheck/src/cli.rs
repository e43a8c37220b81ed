//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use xcheck::{CheckPoint, DEFAULT_MAX_HASH_DEPTH};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "xcheck")]
#[command(about = "Cross-check instrumentation for C translation units")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Instrument a translation unit and write its check header
    Instrument {
        /// Configuration files, merged in order
        #[arg(short, long = "config", value_name = "TOML")]
        configs: Vec<PathBuf>,

        /// Translation unit description
        #[arg(value_name = "UNIT")]
        unit: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Fail when any check had to be dropped
        #[arg(long)]
        strict: bool,
    },

    /// Show the check that applies at one check point
    Resolve {
        /// Configuration files, merged in order
        #[arg(short, long = "config", value_name = "TOML")]
        configs: Vec<PathBuf>,

        /// Source file the function belongs to
        #[arg(long)]
        file: String,

        /// Function name
        #[arg(long)]
        function: String,

        /// Translation unit providing inline annotations
        #[arg(long, value_name = "UNIT")]
        unit: Option<PathBuf>,

        /// Argument to resolve instead of a site
        #[arg(long, conflicts_with = "site")]
        arg: Option<String>,

        /// Site to resolve
        #[arg(long, value_enum, default_value = "entry")]
        site: SiteArg,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the merged configuration
    Config {
        /// Configuration files, merged in order
        #[arg(short, long = "config", value_name = "TOML")]
        configs: Vec<PathBuf>,
    },

    /// Print the djb2 hash of a string
    Djb2 {
        #[arg(value_name = "STRING")]
        input: String,
    },
}

/// Engine settings shared by commands.
#[derive(clap::Args, Clone, Copy, Debug)]
pub struct EngineArgs {
    /// Maximum pointer/record nesting followed by hash routines
    #[arg(long, default_value_t = DEFAULT_MAX_HASH_DEPTH)]
    pub max_depth: usize,

    /// Disable checks that configuration does not enable explicitly
    #[arg(long)]
    pub disable_xchecks: bool,
}

impl EngineArgs {
    pub fn options(self) -> xcheck::EngineOptions {
        xcheck::EngineOptions::new()
            .with_max_hash_depth(self.max_depth)
            .with_disable_xchecks(self.disable_xchecks)
    }
}

/// Check site.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SiteArg {
    Entry,
    Exit,
    Return,
}

impl SiteArg {
    pub fn point(self, arg: Option<&str>) -> CheckPoint {
        match (arg, self) {
            (Some(name), _) => CheckPoint::Argument(name.to_string()),
            (None, Self::Entry) => CheckPoint::Entry,
            (None, Self::Exit) => CheckPoint::Exit,
            (None, Self::Return) => CheckPoint::Return,
        }
    }
}
