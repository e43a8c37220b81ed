//! Cross-check configuration.
//!
//! Configuration is a mapping from source file to an ordered list of
//! items, each one of defaults, function or struct settings. The
//! [`ConfigStore`] merges repeated items and answers lookups by file and
//! name. Declarations may also carry `cross_check: ...` annotations which
//! are parsed with the same grammar (see [`annotation`]).

pub mod annotation;
mod error;
mod items;
mod store;
mod xcheck;

pub use error::*;
pub use items::*;
pub use store::*;
pub use xcheck::*;

pub use xcheck_hash::XCheckTag;
