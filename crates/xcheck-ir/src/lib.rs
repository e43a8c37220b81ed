//! Host model for cross-check instrumentation.
//!
//! This crate describes what the instrumentation engine needs to know
//! about a translation unit (value types, records, functions and their
//! annotations) and what it produces (hash routine descriptors and check
//! calls). It has no knowledge of configuration or hashing policy.

mod call;
mod decl;
mod routine;
mod scope;
mod types;
mod value;

pub use call::*;
pub use decl::*;
pub use routine::*;
pub use scope::*;
pub use types::*;
pub use value::*;

pub use xcheck_hash::{HasherPair, ScalarKind, XCheckTag};
