//! Cross-check synthesis engine.
//!
//! Given the merged configuration and a translation unit, the engine
//! decides the policy of every check point ([`CheckSpecResolver`]), builds
//! type-directed hash routines on demand ([`SynthSession`]) and hands
//! instrumentation calls to a [`Host`] ([`CheckEmitter`]).
//! [`instrument_unit`] drives the three over every function of a unit.
//!
//! The [`eval`] module computes, in Rust, the fingerprints the emitted
//! code reports at runtime.

mod custom;
mod emitter;
mod error;
pub mod eval;
mod host;
mod instrument;
pub mod metrics;
mod options;
mod resolver;
mod synth;

pub use custom::*;
pub use emitter::*;
pub use error::*;
pub use host::*;
pub use instrument::*;
pub use options::*;
pub use resolver::*;
pub use synth::*;
