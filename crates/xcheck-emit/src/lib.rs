//! C emission for cross-check instrumentation.
//!
//! [`CHost`] is the [`xcheck_synth::Host`] used when instrumenting C
//! sources: it collects checks and routines for one unit and renders them
//! as a single header. The header is meant to be included after the
//! unit's record definitions. Instrumented functions call
//! `XCHECK_ENTRY_<fn>()` on entry and `XCHECK_EXIT_<fn>(ret)` before
//! returning.

mod header;
mod host;
mod project;
mod syntax;

pub use header::gen_header;
pub use host::CHost;
pub use project::CProject;
pub use syntax::{c_value, declare};
