//! Fingerprint hashing for cross-check instrumentation.
//!
//! This crate holds everything that must agree bit-for-bit between the
//! synthesized hash routines and whoever checks their output: the check
//! tags, the fingerprint record, the string hash used for names, the two
//! built-in hasher families and the sentinel constants.

mod djb2;
mod fingerprint;
mod hasher;
mod scalar;

pub use djb2::*;
pub use fingerprint::*;
pub use hasher::*;
pub use scalar::*;

/// Default maximum pointer/record nesting followed by a hash routine.
pub const DEFAULT_MAX_HASH_DEPTH: usize = 8;

/// Fingerprint of a null pointer.
pub const NULL_POINTER_HASH: u64 = 0x4e55_4c4c_5f50_5452; // "NULL_PTR"

/// Fingerprint of a non-null pointer whose pointee was not followed.
pub const LEAF_POINTER_HASH: u64 = 0x4c45_4146_5f50_5452; // "LEAF_PTR"

/// Sentinel mixed into every followed non-null pointer.
pub const POINTER_HASH: u64 = 0x5641_4c49_4450_5452; // "VALIDPTR"

/// Fingerprint of a record reached with an exhausted depth budget.
pub const LEAF_RECORD_HASH: u64 = 0x4c45_4146_5f52_4543; // "LEAF_REC"
