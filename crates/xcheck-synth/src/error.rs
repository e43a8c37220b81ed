use std::fmt;

use thiserror::Error;
use xcheck_config::ConfigError;

/// Problems with a single check point.
///
/// None of these abort instrumentation: the affected check (or record
/// field) is dropped and the rest of the unit proceeds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("unresolved parameter `{name}` in custom check `{spec}`")]
    UnresolvedParameter { name: String, spec: String },
    #[error("unknown cross-check type `{kind}` on `{target}`")]
    UnknownCheckKind { target: String, kind: String },
    #[error("malformed cross_check annotation on `{target}`: {reason}")]
    MalformedAnnotation { target: String, reason: String },
    #[error("malformed custom check `{spec}`: {reason}")]
    MalformedCustom { spec: String, reason: String },
    #[error("unknown hasher `{0}`")]
    UnknownHasher(String),
    #[error("no complete definition for `{0}`")]
    UnknownRecord(String),
}

impl CheckError {
    /// Annotation failure on `target`.
    pub(crate) fn from_annotation(target: &str, err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownCheckKind(kind) => Self::UnknownCheckKind {
                target: target.to_string(),
                kind,
            },
            other => Self::MalformedAnnotation {
                target: target.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Diagnostic severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A reported check problem and where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Function, record or field the problem belongs to.
    pub site: String,
    pub error: CheckError,
}

impl Diagnostic {
    pub fn error(site: impl Into<String>, error: CheckError) -> Self {
        Self {
            severity: Severity::Error,
            site: site.into(),
            error,
        }
    }

    pub fn warning(site: impl Into<String>, error: CheckError) -> Self {
        Self {
            severity: Severity::Warning,
            site: site.into(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.site, self.error)
    }
}
