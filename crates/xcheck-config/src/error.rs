use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors.
///
/// All but `Serialize` abort configuration loading; nothing downstream
/// can be trusted once one occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse cross-check configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write cross-check configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown cross-check type `{0}`")]
    UnknownCheckKind(String),
    #[error("cross-check table must set exactly one of `fixed`, `djb2` or `custom`")]
    AmbiguousCheck,
    #[error("{item} entry in `{file}` has no name")]
    MissingName { file: String, item: &'static str },
    #[error("mismatched names in {item} merge: `{existing}` vs `{incoming}`")]
    NameConflict {
        item: &'static str,
        existing: String,
        incoming: String,
    },
    #[error("malformed cross_check annotation `{text}`: {reason}")]
    Annotation { text: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
