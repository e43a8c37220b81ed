use thiserror::Error;

/// Instrumentation errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] xcheck_config::ConfigError),
    #[error(transparent)]
    Unit(#[from] xcheck_ir::UnitError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Check(#[from] xcheck_synth::CheckError),
    #[error("no function `{function}` in unit `{file}`")]
    UnknownFunction { file: String, function: String },
}

pub type Result<T> = std::result::Result<T, Error>;
