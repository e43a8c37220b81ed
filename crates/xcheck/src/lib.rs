//! xcheck - cross-check instrumentation for C translation units
//!
//! Loads cross-check configuration, synthesizes the hash routines and
//! check calls for a unit, and writes them as a C header.
//!
//! # Example
//!
//! ```ignore
//! use xcheck::{EngineOptions, instrument, load_config, load_unit};
//!
//! let store = load_config(&["xcheck.toml"])?;
//! let unit = load_unit("struct1.unit.toml".as_ref())?;
//! let out = instrument(&store, &unit, "output/", &EngineOptions::default())?;
//! println!("{}", out.header.display());
//! ```

// Re-export from sub-crates
pub use xcheck_config::{Config, ConfigError, ConfigStore, XCheck};
pub use xcheck_emit::{CHost, CProject};
pub use xcheck_hash::{DEFAULT_MAX_HASH_DEPTH, Fingerprint, XCheckTag, djb2, djb2_u64};
pub use xcheck_ir::{FunctionDecl, TranslationUnit, UnitError};
pub use xcheck_synth::{CheckError, Diagnostic, EngineOptions, Severity, UnitSummary};

mod error;
pub mod metrics;
mod pipeline;

pub use error::{Error, Result};
pub use pipeline::*;
