//! Counter names recorded by the engine.

use metrics::{Unit, describe_counter};

/// Hash routines built by the synthesizer.
pub const ROUTINES_SYNTHESIZED: &str = "xcheck_routines_synthesized_total";
/// Check calls handed to the host.
pub const CHECKS_EMITTED: &str = "xcheck_checks_emitted_total";
/// Diagnostics reported while instrumenting.
pub const DIAGNOSTICS: &str = "xcheck_diagnostics_total";

/// Register descriptions of the engine's counters with the installed
/// recorder.
pub fn describe() {
    describe_counter!(
        ROUTINES_SYNTHESIZED,
        Unit::Count,
        "Total hash routines synthesized"
    );
    describe_counter!(CHECKS_EMITTED, Unit::Count, "Total check calls emitted");
    describe_counter!(
        DIAGNOSTICS,
        Unit::Count,
        "Total diagnostics reported by the engine"
    );
}
