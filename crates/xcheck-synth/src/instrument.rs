//! Unit driver.

use tracing::{debug, info, trace_span};
use xcheck_config::{ConfigStore, XCheck};
use xcheck_hash::HasherPair;
use xcheck_ir::{
    CheckSite, FunctionDecl, Scope, ScopedValue, SitePosition, TranslationUnit, ValueRef,
};

use crate::emitter::{CheckContext, CheckEmitter};
use crate::error::Diagnostic;
use crate::host::Host;
use crate::options::EngineOptions;
use crate::resolver::{CheckRole, CheckSpecResolver, FunctionPolicy};
use crate::synth::{SynthContext, SynthSession};

/// Outcome of instrumenting one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitSummary {
    pub file: String,
    /// Functions with a body.
    pub functions: usize,
    pub checks: usize,
    pub routines: usize,
    pub diagnostics: usize,
}

/// Instrument every function definition of `unit`, in declaration order,
/// then flush the synthesized routines to `host`.
pub fn instrument_unit<H: Host>(
    store: &ConfigStore,
    unit: &TranslationUnit,
    host: &mut H,
    options: &EngineOptions,
) -> UnitSummary {
    let _span = trace_span!("instrument_unit", file = %unit.file).entered();
    let resolver = CheckSpecResolver::new(store, options);
    let mut session = SynthSession::new();
    let mut emitter = CheckEmitter::new(host, &mut session, options);

    let mut functions = 0;
    for func in unit.functions.iter().filter(|f| f.has_body) {
        instrument_function(&resolver, &mut emitter, unit, func);
        functions += 1;
    }
    let (checks, diagnostics) = emitter.finish();

    let summary = UnitSummary {
        file: unit.file.clone(),
        functions,
        checks,
        routines: session.synthesized(),
        diagnostics,
    };
    info!(
        file = %summary.file,
        functions = summary.functions,
        checks = summary.checks,
        routines = summary.routines,
        diagnostics = summary.diagnostics,
        "instrumented unit"
    );
    summary
}

fn emit_role<H: Host>(
    resolver: &CheckSpecResolver<'_>,
    emitter: &mut CheckEmitter<'_, H>,
    policy: &FunctionPolicy,
    role: CheckRole<'_>,
    annotations: &[String],
    value: Option<&ScopedValue>,
    cx: &CheckContext<'_>,
) {
    match resolver.resolve_function(policy, role, annotations) {
        Ok(check) => {
            emitter.emit(&check, role.tag(), value, cx);
        }
        Err(err) => {
            let site = match role {
                CheckRole::Argument(name) => format!("{}:{name}", cx.function),
                _ => cx.function.to_string(),
            };
            emitter.report(Diagnostic::error(site, err));
        }
    }
}

fn emit_extras<H: Host>(
    resolver: &CheckSpecResolver<'_>,
    emitter: &mut CheckEmitter<'_, H>,
    policy: &FunctionPolicy,
    position: SitePosition,
    cx: &CheckContext<'_>,
) {
    for (tag, custom) in resolver.extra_checks(policy, position) {
        emitter.emit(&XCheck::Custom(custom), tag, None, cx);
    }
}

fn instrument_function<H: Host>(
    resolver: &CheckSpecResolver<'_>,
    emitter: &mut CheckEmitter<'_, H>,
    unit: &TranslationUnit,
    func: &FunctionDecl,
) {
    let (policy, problem) = resolver.effective_function_config(&unit.file, func);
    if let Some(err) = problem {
        emitter.report(Diagnostic::error(&func.name, err));
    }
    debug!(function = %func.name, disabled = policy.disabled(), "instrumenting function");

    let hashers = resolver.function_hashers(&policy).unwrap_or_else(|err| {
        emitter.report(Diagnostic::warning(&func.name, err));
        HasherPair::BUILTIN
    });
    let scope = Scope::for_function(unit, func);
    let synth = SynthContext {
        resolver,
        file: &unit.file,
        hashers,
    };
    let entry = CheckContext {
        site: CheckSite::entry(&func.name),
        function: &func.name,
        scope: &scope,
        synth,
    };
    let exit = CheckContext {
        site: CheckSite::exit(&func.name),
        ..entry.clone()
    };

    emit_role(resolver, emitter, &policy, CheckRole::Entry, &[], None, &entry);
    emit_extras(resolver, emitter, &policy, SitePosition::Entry, &entry);
    for param in &func.params {
        let value = ScopedValue {
            value: ValueRef::var(&param.name),
            ty: param.ty.clone(),
        };
        emit_role(
            resolver,
            emitter,
            &policy,
            CheckRole::Argument(&param.name),
            &param.annotations,
            Some(&value),
            &entry,
        );
    }

    emit_role(resolver, emitter, &policy, CheckRole::Exit, &[], None, &exit);
    emit_extras(resolver, emitter, &policy, SitePosition::Exit, &exit);
    if let Some(ret) = &func.ret {
        let value = ScopedValue {
            value: ValueRef::ReturnValue,
            ty: ret.clone(),
        };
        emit_role(resolver, emitter, &policy, CheckRole::Return, &[], Some(&value), &exit);
    }
}
