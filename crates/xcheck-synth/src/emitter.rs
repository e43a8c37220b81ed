//! Turning resolved checks into host calls.

use metrics::counter;
use tracing::{debug, trace};
use xcheck_config::XCheck;
use xcheck_hash::{XCheckTag, djb2_u64};
use xcheck_ir::{CallHandle, CheckCall, CheckSite, CheckValue, Scope, ScopedValue};

use crate::custom::CustomSpec;
use crate::error::Diagnostic;
use crate::host::Host;
use crate::metrics::{CHECKS_EMITTED, DIAGNOSTICS};
use crate::options::EngineOptions;
use crate::synth::{SynthContext, SynthSession};

/// Where a check is emitted and what it can see.
#[derive(Clone, Debug)]
pub struct CheckContext<'a> {
    pub site: CheckSite,
    /// Name hashed by `default` entry and exit checks.
    pub function: &'a str,
    pub scope: &'a Scope,
    pub synth: SynthContext<'a>,
}

/// Emits checks through a host, synthesizing routines as needed.
pub struct CheckEmitter<'a, H: Host> {
    host: &'a mut H,
    session: &'a mut SynthSession,
    options: &'a EngineOptions,
    emitted: usize,
    diagnostics: usize,
}

impl<'a, H: Host> CheckEmitter<'a, H> {
    pub fn new(host: &'a mut H, session: &'a mut SynthSession, options: &'a EngineOptions) -> Self {
        Self {
            host,
            session,
            options,
            emitted: 0,
            diagnostics: 0,
        }
    }

    /// Calls emitted so far.
    #[must_use]
    pub const fn emitted(&self) -> usize {
        self.emitted
    }

    /// Diagnostics reported so far, including those of synthesis.
    #[must_use]
    pub const fn diagnostics(&self) -> usize {
        self.diagnostics + self.session.diagnostics()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "check diagnostic");
        counter!(DIAGNOSTICS).increment(1);
        self.diagnostics += 1;
        self.host.report(diagnostic);
    }

    /// Emit `check` for `value` (or for the function itself at entry and
    /// exit). Returns `None` when nothing was emitted.
    pub fn emit(
        &mut self,
        check: &XCheck,
        tag: XCheckTag,
        value: Option<&ScopedValue>,
        cx: &CheckContext<'_>,
    ) -> Option<CallHandle> {
        let value = match check {
            XCheck::Disabled => return None,
            XCheck::Fixed(k) => CheckValue::Const(*k),
            XCheck::Djb2(s) => CheckValue::Const(djb2_u64(s)),
            XCheck::Default => match value {
                Some(v) => {
                    let routine = self
                        .session
                        .routine_for(&cx.synth, self.host, &v.ty, None, true);
                    CheckValue::Hash {
                        arg: routine.argument(v.value.clone()),
                        routine,
                        depth: self.options.max_hash_depth,
                    }
                }
                None => CheckValue::Const(djb2_u64(cx.function)),
            },
            XCheck::Custom(text) => {
                let resolved = text
                    .parse::<CustomSpec>()
                    .and_then(|spec| spec.resolve(cx.scope, value));
                match resolved {
                    Ok(call) => {
                        self.host
                            .lookup_or_declare_routine(&call.function, &call.signature);
                        CheckValue::Custom {
                            function: call.function,
                            args: call.args,
                        }
                    }
                    Err(err) => {
                        self.report(Diagnostic::error(cx.function, err));
                        return None;
                    }
                }
            }
        };

        trace!(site = %cx.site, %tag, "emitting check");
        counter!(CHECKS_EMITTED).increment(1);
        self.emitted += 1;
        Some(self.host.emit_call(&cx.site, CheckCall { tag, value }))
    }

    /// Flush the session's routines; returns `(calls, diagnostics)`.
    pub fn finish(self) -> (usize, usize) {
        let diagnostics = self.diagnostics();
        self.session.finish(self.host);
        (self.emitted, diagnostics)
    }
}
